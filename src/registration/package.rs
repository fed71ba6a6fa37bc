//! Participation packages offered by the conference.

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Package category chosen by the registrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Package {
    /// Day-three business programme.
    Business,
    /// Closing gala dinner.
    Gala,
    /// Business programme plus gala dinner.
    Full,
}

impl Package {
    pub const ALL: [Package; 3] = [Package::Business, Package::Gala, Package::Full];

    /// Stable option identifier (button payload and stored value).
    pub fn id(&self) -> &'static str {
        match self {
            Self::Business => "business",
            Self::Gala => "gala",
            Self::Full => "full",
        }
    }

    /// Price in rubles.
    pub fn price(&self) -> Decimal {
        match self {
            Self::Business => dec!(2990),
            Self::Gala => dec!(3490),
            Self::Full => dec!(5990),
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Self::Business => "Деловая программа",
            Self::Gala => "Гала-ужин",
            Self::Full => "Деловая программа и гала-ужин",
        }
    }

    /// Label shown on the selection button, e.g. `Гала-ужин - 3 490`.
    pub fn button_label(&self) -> String {
        format!("{} - {}", self.title(), format_amount(self.price()))
    }

    /// Human-readable name with currency, used in the mirror sheet.
    pub fn display_name(&self) -> String {
        format!("{} - {}₽", self.title(), format_amount(self.price()))
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Package {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "business" => Ok(Self::Business),
            "gala" => Ok(Self::Gala),
            "full" => Ok(Self::Full),
            other => Err(format!("unknown package: {other}")),
        }
    }
}

/// Format a whole-ruble amount with thin grouping: `5990` → `5 990`.
fn format_amount(amount: Decimal) -> String {
    let digits = amount.round_dp(0).abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(ch);
    }
    if amount.is_sign_negative() && !amount.is_zero() {
        out.insert(0, '-');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_parse_back() {
        for package in Package::ALL {
            assert_eq!(package.id().parse::<Package>().unwrap(), package);
            assert_eq!(package.to_string(), package.id());
        }
        assert!("vip".parse::<Package>().is_err());
        assert!("Full".parse::<Package>().is_err());
    }

    #[test]
    fn labels_are_currency_formatted() {
        assert_eq!(Package::Business.button_label(), "Деловая программа - 2 990");
        assert_eq!(Package::Gala.display_name(), "Гала-ужин - 3 490₽");
        assert_eq!(
            Package::Full.display_name(),
            "Деловая программа и гала-ужин - 5 990₽"
        );
    }

    #[test]
    fn format_amount_groups_thousands() {
        assert_eq!(format_amount(dec!(0)), "0");
        assert_eq!(format_amount(dec!(990)), "990");
        assert_eq!(format_amount(dec!(6490)), "6 490");
        assert_eq!(format_amount(dec!(1234567)), "1 234 567");
    }

    #[test]
    fn full_package_costs_less_than_parts() {
        assert!(Package::Full.price() < Package::Business.price() + Package::Gala.price());
    }
}
