use crate::{LcpError, LcpErrorCode, LinearUnit, Result};

/// Ordered `KEY=VALUE` creation options. Keys compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreationOptions {
    entries: Vec<(String, String)>,
}

impl CreationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse<I, S>(items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut options = Self::new();
        for item in items {
            let item = item.as_ref();
            let (key, value) = item.split_once('=').ok_or_else(|| {
                LcpError::new(
                    LcpErrorCode::InvalidOption,
                    format!("Creation option '{item}' is not of the form KEY=VALUE."),
                )
            })?;
            options.set(key.trim(), value.trim());
        }
        Ok(options)
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self
            .entries
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    /// `NO`, `FALSE`, `OFF` and `0` are false, any other value is true.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            Some(value) => !["NO", "FALSE", "OFF", "0"]
                .iter()
                .any(|falsy| falsy.eq_ignore_ascii_case(value.trim())),
            None => default,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinearUnitOption {
    #[default]
    FromSrs,
    Fixed(LinearUnit),
}

impl LinearUnitOption {
    pub fn parse(value: &str) -> Result<Self> {
        let upper = value.trim().to_ascii_uppercase();
        if upper == "SET_FROM_SRS" {
            Ok(Self::FromSrs)
        } else if upper.starts_with("METER") {
            Ok(Self::Fixed(LinearUnit::Meters))
        } else if upper == "FOOT" || upper == "FEET" {
            Ok(Self::Fixed(LinearUnit::Feet))
        } else if upper.starts_with("KILOMETER") {
            Ok(Self::Fixed(LinearUnit::Kilometers))
        } else {
            Err(LcpError::new(
                LcpErrorCode::InvalidOption,
                format!("Invalid value ({value}) for LINEAR_UNIT."),
            ))
        }
    }

    pub fn from_options(options: &CreationOptions) -> Result<Self> {
        options
            .get("LINEAR_UNIT")
            .map_or(Ok(Self::FromSrs), Self::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_case_insensitive_and_last_set_wins() {
        let options = CreationOptions::parse(["latitude=45", "LATITUDE = 46", "DESCRIPTION=a=b"])
            .expect("parse options");
        assert_eq!(options.get("Latitude"), Some("46"));
        assert_eq!(options.get("description"), Some("a=b"));
        assert_eq!(options.iter().count(), 2);
    }

    #[test]
    fn rejects_entry_without_separator() {
        let error = CreationOptions::parse(["CALCULATE_STATS"]).expect_err("should reject");
        assert_eq!(error.code, LcpErrorCode::InvalidOption);
    }

    #[test]
    fn bool_values() {
        let options = CreationOptions::new()
            .with("CALCULATE_STATS", "no")
            .with("CLASSIFY_DATA", "YES")
            .with("OTHER", "Off");
        assert!(!options.get_bool("CALCULATE_STATS", true));
        assert!(options.get_bool("CLASSIFY_DATA", false));
        assert!(!options.get_bool("OTHER", true));
        assert!(options.get_bool("MISSING", true));
    }

    #[test]
    fn linear_unit_option_values() {
        let cases = [
            ("SET_FROM_SRS", LinearUnitOption::FromSrs),
            ("meters", LinearUnitOption::Fixed(LinearUnit::Meters)),
            ("METER", LinearUnitOption::Fixed(LinearUnit::Meters)),
            ("Feet", LinearUnitOption::Fixed(LinearUnit::Feet)),
            ("FOOT", LinearUnitOption::Fixed(LinearUnit::Feet)),
            ("KILOMETERS", LinearUnitOption::Fixed(LinearUnit::Kilometers)),
        ];
        for (value, expected) in cases {
            assert_eq!(LinearUnitOption::parse(value).expect(value), expected);
        }
        let error = LinearUnitOption::parse("FURLONG").expect_err("should reject");
        assert_eq!(error.code, LcpErrorCode::InvalidOption);
        assert_eq!(
            LinearUnitOption::from_options(&CreationOptions::new()).expect("default"),
            LinearUnitOption::FromSrs
        );
    }
}
