//! Time of interest used when checking certificate validity and the freshness of revocation evidence

use core::{cmp::Ordering, fmt, time::Duration};

use serde::{
    de::{self, Deserializer, Visitor},
    ser::Serializer,
    Deserialize, Serialize,
};

/// Instant at which certificates and revocation evidence are evaluated, typically the signing time.
///
/// A value of zero seconds since the Unix epoch disables time checks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub struct TimeOfInterest(pub der::DateTime);

impl fmt::Display for TimeOfInterest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TimeOfInterest {
    /// The epoch itself, which turns off validity and freshness checks
    pub fn disabled() -> Self {
        // from_unix_duration only fails outside 1970..=9999
        Self(der::DateTime::from_unix_duration(Duration::ZERO).unwrap_or(der::DateTime::INFINITY))
    }

    /// True when validity and freshness checks are turned off
    pub fn is_disabled(&self) -> bool {
        self.as_unix_secs() == 0
    }

    /// Builds a time of interest from seconds since the Unix epoch
    pub fn from_unix_secs(secs: u64) -> der::Result<Self> {
        der::DateTime::from_unix_duration(Duration::from_secs(secs)).map(Self)
    }

    /// Seconds since the Unix epoch
    pub fn as_unix_secs(&self) -> u64 {
        self.0.unix_duration().as_secs()
    }
}

#[cfg(not(feature = "std"))]
impl Default for TimeOfInterest {
    fn default() -> Self {
        Self::disabled()
    }
}

impl PartialEq<x509_cert::time::Time> for TimeOfInterest {
    fn eq(&self, other: &x509_cert::time::Time) -> bool {
        self.0.eq(&other.to_date_time())
    }
}

impl PartialOrd<x509_cert::time::Time> for TimeOfInterest {
    fn partial_cmp(&self, other: &x509_cert::time::Time) -> Option<Ordering> {
        self.0.partial_cmp(&other.to_date_time())
    }
}

impl PartialEq<der::asn1::GeneralizedTime> for TimeOfInterest {
    fn eq(&self, other: &der::asn1::GeneralizedTime) -> bool {
        self.0.eq(&other.to_date_time())
    }
}

impl PartialOrd<der::asn1::GeneralizedTime> for TimeOfInterest {
    fn partial_cmp(&self, other: &der::asn1::GeneralizedTime) -> Option<Ordering> {
        self.0.partial_cmp(&other.to_date_time())
    }
}

impl Serialize for TimeOfInterest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.as_unix_secs())
    }
}

impl<'de> Deserialize<'de> for TimeOfInterest {
    fn deserialize<D>(deserializer: D) -> Result<TimeOfInterest, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ToiVisitor;

        impl<'de> Visitor<'de> for ToiVisitor {
            type Value = TimeOfInterest;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an integer between 0 and 2^64")
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                TimeOfInterest::from_unix_secs(value)
                    .map_err(|_| E::custom("time of interest out of range"))
            }
        }

        deserializer.deserialize_u64(ToiVisitor)
    }
}

#[cfg(feature = "std")]
mod std_time {
    use super::*;

    impl TimeOfInterest {
        /// Creates a [`TimeOfInterest`] for the current time, falling back to a disabled value if the
        /// system clock is outside the range a DateTime can represent.
        pub fn now() -> Self {
            match der::DateTime::from_system_time(::std::time::SystemTime::now()) {
                Ok(dt) => Self(dt),
                Err(_) => Self::disabled(),
            }
        }
    }

    impl Default for TimeOfInterest {
        fn default() -> Self {
            Self::now()
        }
    }
}

#[test]
fn toi_compare_test() {
    use der::asn1::GeneralizedTime;
    let toi = TimeOfInterest::from_unix_secs(1_700_000_000).unwrap();
    let earlier = GeneralizedTime::from_unix_duration(Duration::from_secs(1_600_000_000)).unwrap();
    let later = GeneralizedTime::from_unix_duration(Duration::from_secs(1_800_000_000)).unwrap();
    assert!(toi > earlier);
    assert!(toi < later);
    assert!(!toi.is_disabled());
    assert!(TimeOfInterest::disabled().is_disabled());
    assert_eq!(1_700_000_000, toi.as_unix_secs());
}
