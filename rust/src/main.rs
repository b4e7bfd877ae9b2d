use std::env;
use std::io::{self, Write};
use std::process;

use iceland::{
    DEFAULT_SEPARATOR, EntityKind, Kennitala, KennitalaGen, PostalCodes, find_locale,
    list_postal_codes,
};
use serde_json::json;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
struct ParseOpts {
    json: bool,
    separator: String,
}

impl Default for ParseOpts {
    fn default() -> Self {
        Self {
            json: false,
            separator: default_separator(),
        }
    }
}

#[derive(Debug, Clone)]
struct GenerateOpts {
    kind: EntityKind,
    count: usize,
    json: bool,
    separator: Option<String>,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            kind: EntityKind::Person,
            count: 1,
            json: false,
            separator: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct ListOpts {
    po_boxes: bool,
    nominative: bool,
    json: bool,
}

fn default_separator() -> String {
    env::var("ICELAND_SEPARATOR").unwrap_or_else(|_| DEFAULT_SEPARATOR.to_string())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(env::var("ICELAND_LOG").unwrap_or_else(|_| "warn".to_string()))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn print_help() {
    eprintln!(
        "iceland - kennitala and postal code CLI\n\n\
Usage:\n  iceland validate <kennitala>\n  iceland parse <kennitala> [--json] [--separator <s>]\n  iceland generate [--company] [--kind person|company] [--count <n>] [--separator <s>] [--json]\n  iceland locale <postal-code> [--nominative]\n  iceland postal-codes [--po-boxes] [--nominative] [--json]\n  iceland selftest\n\n\
Environment:\n  RUST_LOG / ICELAND_LOG   log filter (default: warn)\n  ICELAND_SEPARATOR        default separator for parse output (default: space)\n"
    );
}

fn flag_value<'a>(args: &'a [String], i: usize, flag: &str) -> Result<&'a str, String> {
    args.get(i + 1)
        .map(String::as_str)
        .ok_or_else(|| format!("missing value for {flag}"))
}

fn parse_parse_flags(args: &[String]) -> Result<ParseOpts, String> {
    let mut opts = ParseOpts::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--json" => {
                opts.json = true;
                i += 1;
            }
            "--separator" => {
                opts.separator = flag_value(args, i, "--separator")?.to_string();
                i += 2;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn parse_generate_flags(args: &[String]) -> Result<GenerateOpts, String> {
    let mut opts = GenerateOpts::default();
    let mut i = 0;

    while i < args.len() {
        match args[i].as_str() {
            "--company" => {
                opts.kind = EntityKind::Company;
                i += 1;
            }
            "--kind" => {
                let value = flag_value(args, i, "--kind")?;
                opts.kind = EntityKind::parse(value)
                    .ok_or_else(|| "--kind must be one of: person, company".to_string())?;
                i += 2;
            }
            "--count" => {
                opts.count = flag_value(args, i, "--count")?
                    .parse::<usize>()
                    .map_err(|_| "invalid integer for --count".to_string())?;
                i += 2;
            }
            "--separator" => {
                opts.separator = Some(flag_value(args, i, "--separator")?.to_string());
                i += 2;
            }
            "--json" => {
                opts.json = true;
                i += 1;
            }
            _ => return Err(format!("unknown flag: {}", args[i])),
        }
    }

    Ok(opts)
}

fn parse_list_flags(args: &[String]) -> Result<ListOpts, String> {
    let mut opts = ListOpts::default();

    for arg in args {
        match arg.as_str() {
            "--po-boxes" => opts.po_boxes = true,
            "--nominative" => opts.nominative = true,
            "--json" => opts.json = true,
            _ => return Err(format!("unknown flag: {arg}")),
        }
    }

    Ok(opts)
}

fn run_validate(args: &[String]) -> Result<(), String> {
    let Some(input) = args.first() else {
        return Err("validate requires a kennitala".to_string());
    };
    if args.len() > 1 {
        return Err(format!("unknown flag: {}", args[1]));
    }

    let ok = Kennitala::parse(input).is_ok();
    println!("{}", if ok { "true" } else { "false" });
    if ok {
        Ok(())
    } else {
        Err("invalid kennitala".to_string())
    }
}

fn run_parse(args: &[String]) -> Result<(), String> {
    let Some(input) = args.first() else {
        return Err("parse requires a kennitala".to_string());
    };
    let opts = parse_parse_flags(&args[1..])?;
    let kt = Kennitala::parse(input).map_err(|e| e.to_string())?;

    if opts.json {
        let payload = json!({
            "kennitala": kt.as_str(),
            "display": kt.display(&opts.separator),
            "entity_kind": kt.entity_kind().as_str(),
            "date": kt.to_date().to_string(),
            "year": kt.year(),
            "month": kt.month(),
            "day": kt.day(),
            "age": kt.age(),
        });
        println!(
            "{}",
            serde_json::to_string(&payload).map_err(|e| e.to_string())?
        );
    } else {
        println!("kennitala={}", kt.as_str());
        println!("display={}", kt.display(&opts.separator));
        println!("entity_kind={}", kt.entity_kind());
        println!("date={}", kt.to_date());
        println!("age={}", kt.age());
    }

    Ok(())
}

fn run_generate(args: &[String]) -> Result<(), String> {
    let opts = parse_generate_flags(args)?;
    let generator = KennitalaGen::new(opts.kind);
    let mut out = io::stdout().lock();

    for kt in generator.take(opts.count) {
        let text = match &opts.separator {
            Some(sep) => kt.display(sep),
            None => kt.to_string(),
        };
        if opts.json {
            let payload = json!({
                "kennitala": text,
                "entity_kind": kt.entity_kind().as_str(),
                "date": kt.to_date().to_string(),
            });
            writeln!(
                out,
                "{}",
                serde_json::to_string(&payload).map_err(|e| e.to_string())?
            )
            .map_err(|e| e.to_string())?;
        } else {
            writeln!(out, "{text}").map_err(|e| e.to_string())?;
        }
    }

    out.flush().map_err(|e| e.to_string())
}

fn run_locale(args: &[String]) -> Result<(), String> {
    let Some(code) = args.first() else {
        return Err("locale requires a postal code".to_string());
    };
    let mut nominative = false;
    for arg in &args[1..] {
        match arg.as_str() {
            "--nominative" => nominative = true,
            _ => return Err(format!("unknown flag: {arg}")),
        }
    }

    match find_locale(code.as_str(), nominative) {
        Some(name) => {
            println!("{name}");
            Ok(())
        }
        None => Err(format!("unknown postal code: {code}")),
    }
}

fn run_postal_codes(args: &[String]) -> Result<(), String> {
    let opts = parse_list_flags(args)?;
    let entries = list_postal_codes(opts.po_boxes, opts.nominative);
    debug!(count = entries.len(), "listing postal codes");

    if opts.json {
        println!(
            "{}",
            serde_json::to_string(&entries).map_err(|e| e.to_string())?
        );
    } else {
        for entry in entries {
            println!("{} {}", entry.postal_code, entry.locale);
        }
    }

    Ok(())
}

fn run_selftest() -> Result<(), String> {
    let person = Kennitala::generate_person();
    let company = Kennitala::generate_company();
    if !person.is_person() || !company.is_company() {
        return Err("selftest failed: wrong entity kind".to_string());
    }
    if Kennitala::parse(person.as_str()).as_ref() != Ok(&person) {
        return Err("selftest failed: person did not round-trip".to_string());
    }
    if PostalCodes::bundled().is_empty() {
        return Err("selftest failed: no postal codes".to_string());
    }
    println!("ok person={person} company={company}");
    Ok(())
}

fn main() {
    init_logging();
    let args: Vec<String> = env::args().skip(1).collect();

    if args.is_empty() {
        print_help();
        process::exit(2);
    }

    let cmd = args[0].as_str();
    let rest = &args[1..];

    let res = match cmd {
        "-h" | "--help" | "help" => {
            print_help();
            Ok(())
        }
        "validate" => run_validate(rest),
        "parse" => run_parse(rest),
        "generate" => run_generate(rest),
        "locale" => run_locale(rest),
        "postal-codes" => run_postal_codes(rest),
        "selftest" => run_selftest(),
        _ => Err(format!("unknown command: {cmd}")),
    };

    if let Err(err) = res {
        error!(command = cmd, %err, "command failed");
        eprintln!("error: {err}");
        process::exit(1);
    }
}
