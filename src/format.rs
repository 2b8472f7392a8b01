//! Display helpers for amounts of money.

use std::sync::OnceLock;

use numfmt::{Formatter, Precision};
use rust_decimal::Decimal;

/// Format `amount` as dollars with thousands separators and two decimals,
/// e.g. `-$1,234.50`.
pub fn currency(amount: Decimal) -> String {
    static FMT: OnceLock<Option<Formatter>> = OnceLock::new();

    let fmt = FMT.get_or_init(|| {
        Formatter::currency("$")
            .ok()
            .map(|fmt| fmt.precision(Precision::Decimals(2)))
    });

    let amount = amount.round_dp(2);
    let sign = if amount.is_sign_negative() && !amount.is_zero() {
        "-"
    } else {
        ""
    };
    let magnitude = f64::try_from(amount.abs()).unwrap_or_default();

    let formatted = match fmt {
        // Zero is hardcoded as "0" by numfmt.
        Some(_) if amount.is_zero() => "$0.00".to_owned(),
        Some(fmt) => fmt.fmt_string(magnitude),
        None => format!("${magnitude:.2}"),
    };

    format!("{sign}{}", pad_cents(formatted))
}

/// numfmt drops trailing zeros from the fraction, e.g. "12.30" becomes "12.3".
fn pad_cents(formatted: String) -> String {
    match formatted.rfind('.') {
        None => format!("{formatted}.00"),
        Some(dot) => {
            let decimals = formatted.len() - dot - 1;
            format!("{formatted}{}", "0".repeat(2usize.saturating_sub(decimals)))
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::format::currency;

    #[test]
    fn formats_zero() {
        assert_eq!(currency(Decimal::ZERO), "$0.00");
        assert_eq!(currency(dec!(-0.001)), "$0.00");
    }

    #[test]
    fn pads_to_two_decimals() {
        assert_eq!(currency(dec!(12.3)), "$12.30");
        assert_eq!(currency(dec!(7)), "$7.00");
        assert_eq!(currency(dec!(0.05)), "$0.05");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(currency(dec!(1234.5)), "$1,234.50");
    }

    #[test]
    fn negative_amounts_lead_with_minus() {
        assert_eq!(currency(dec!(-42.75)), "-$42.75");
    }
}
