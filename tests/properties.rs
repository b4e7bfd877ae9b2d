//! Property tests for kennitala parsing, formatting and age.

use chrono::{Datelike, NaiveDate};
use iceland::{Kennitala, check_digit, checksum};
use proptest::prelude::*;

fn first_eight_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(0u32..10, 8)
        .prop_map(|digits| digits.iter().map(|d| d.to_string()).collect())
}

// Days stop at 28 so every month works.
fn valid_kennitala() -> impl Strategy<Value = String> {
    (
        1u32..=28,
        any::<bool>(),
        1u32..=12,
        0u32..=99,
        prop_oneof![Just(0u32), Just(8u32), Just(9u32)],
        0u32..=99,
    )
        .prop_filter_map(
            "no check digit for these digits",
            |(day, company, month, year, century, sequence)| {
                let day = if company { day + 40 } else { day };
                let first_eight = format!("{day:02}{month:02}{year:02}{sequence:02}");
                check_digit(&first_eight).map(|check| format!("{first_eight}{check}{century}"))
            },
        )
}

proptest! {
    #[test]
    fn canonical_form_roundtrips(s in valid_kennitala()) {
        let kt = Kennitala::parse(&s).unwrap();
        prop_assert_eq!(kt.as_str(), s.as_str());
        prop_assert_eq!(Kennitala::parse(&kt.to_string()).unwrap(), kt);
    }

    #[test]
    fn only_the_computed_check_digit_is_accepted(first_eight in first_eight_strategy()) {
        let expected = match checksum(&first_eight).unwrap() % 11 {
            0 => Some(0),
            r if r == 10 || 11 - r > 9 => None,
            r => Some(11 - r),
        };
        prop_assert_eq!(check_digit(&first_eight), expected);

        // 1st of January 1930 keeps the date fields valid while the sequence digits vary.
        let dated = format!("010130{}", &first_eight[6..]);
        let expected = check_digit(&dated);
        for c in 0..10u32 {
            let accepted = Kennitala::parse(&format!("{dated}{c}9")).is_ok();
            prop_assert_eq!(accepted, expected == Some(c));
        }
    }

    #[test]
    fn display_inserts_exactly_one_separator(
        s in valid_kennitala(),
        sep in "[-,./|:]{1,3}",
    ) {
        let kt = Kennitala::parse(&s).unwrap();
        let shown = kt.display(&sep);
        prop_assert_eq!(&shown[..6], &s[..6]);
        prop_assert_eq!(&shown[6..6 + sep.len()], sep.as_str());
        prop_assert_eq!(&shown[6 + sep.len()..], &s[6..]);
        prop_assert_eq!(shown.replace(&sep, ""), s);
    }

    #[test]
    fn age_increments_on_the_anniversary(s in valid_kennitala(), later in 1i32..=150) {
        let kt = Kennitala::parse(&s).unwrap();
        let born = kt.to_date();
        let anniversary =
            NaiveDate::from_ymd_opt(born.year() + later, born.month(), born.day()).unwrap();
        prop_assert_eq!(kt.age_on(anniversary), later);
        prop_assert_eq!(kt.age_on(anniversary.pred_opt().unwrap()), later - 1);
    }

    #[test]
    fn generated_kennitalas_parse(company in any::<bool>()) {
        let kt = Kennitala::generate(company);
        prop_assert_eq!(kt.is_company(), company);
        prop_assert_eq!(kt.is_person(), !company);
        prop_assert_eq!(Kennitala::parse(kt.as_str()).unwrap(), kt);
    }
}
