use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(Role {
    Admin => "admin",
    Doctor => "doctor",
});

str_enum!(AppointmentStatus {
    Pending => "pending",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(MedicineTiming {
    Before => "before",
    After => "after",
});

impl Default for AppointmentStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl MedicineTiming {
    /// Lenient parse used for prescription input: only an explicit "before"
    /// means before a meal.
    pub fn from_input(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("before") => Self::Before,
            _ => Self::After,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Before => "Before meal",
            Self::After => "After meal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn role_round_trip() {
        for (variant, s) in [(Role::Admin, "admin"), (Role::Doctor, "doctor")] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(Role::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn appointment_status_round_trip() {
        for (variant, s) in [
            (AppointmentStatus::Pending, "pending"),
            (AppointmentStatus::Completed, "completed"),
            (AppointmentStatus::Cancelled, "cancelled"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(AppointmentStatus::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn status_defaults_to_pending() {
        assert_eq!(AppointmentStatus::default(), AppointmentStatus::Pending);
    }

    #[test]
    fn timing_input_defaults_to_after() {
        assert_eq!(MedicineTiming::from_input(Some("before")), MedicineTiming::Before);
        assert_eq!(MedicineTiming::from_input(Some(" before ")), MedicineTiming::Before);
        assert_eq!(MedicineTiming::from_input(Some("after")), MedicineTiming::After);
        assert_eq!(MedicineTiming::from_input(Some("whenever")), MedicineTiming::After);
        assert_eq!(MedicineTiming::from_input(None), MedicineTiming::After);
    }

    #[test]
    fn timing_labels() {
        assert_eq!(MedicineTiming::Before.label(), "Before meal");
        assert_eq!(MedicineTiming::After.label(), "After meal");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"doctor\"");
        let status: AppointmentStatus = serde_json::from_str("\"cancelled\"").unwrap();
        assert_eq!(status, AppointmentStatus::Cancelled);
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(Role::from_str("student").is_err());
        assert!(AppointmentStatus::from_str("done").is_err());
        assert!(MedicineTiming::from_str("").is_err());
    }
}
