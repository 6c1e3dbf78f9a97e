use {
    super::error::CoreError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Non-negative amount in minor units (paise / cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(0);

    pub fn new(minor: i64) -> Result<Self, CoreError> {
        if minor < 0 {
            return Err(CoreError::Validation(format!(
                "MoneyAmount cannot be negative, got: {minor}"
            )));
        }
        Ok(Self(minor))
    }

    pub fn minor_units(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_sub(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0
            .checked_sub(other.0)
            .filter(|&v| v >= 0)
            .map(MoneyAmount)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Inr,
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inr => "inr",
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = CoreError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_ascii_lowercase().as_str() {
            "inr" => Ok(Self::Inr),
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            other => Err(CoreError::Validation(format!("unknown currency: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_amount_rejected() {
        assert!(MoneyAmount::new(-1).is_err());
        assert!(MoneyAmount::new(0).is_ok());
    }

    #[test]
    fn checked_sub_never_goes_negative() {
        let a = MoneyAmount::new(100).unwrap();
        let b = MoneyAmount::new(150).unwrap();
        assert!(a.checked_sub(b).is_none());
        assert_eq!(b.checked_sub(a).unwrap().minor_units(), 50);
    }

    #[test]
    fn currency_roundtrip() {
        for c in [Currency::Inr, Currency::Usd, Currency::Eur, Currency::Gbp] {
            assert_eq!(Currency::try_from(c.as_str()).unwrap(), c);
        }
        assert!(Currency::try_from("xyz").is_err());
    }
}
