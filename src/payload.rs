//! Module to format a location sample into the text encoded in the QR code,
//! and into a human-readable summary.

use crate::location::Location;
use chrono::{DateTime, FixedOffset, Local, Locale, Utc};
use log::debug;

/// Medium-length date and time pattern for the given locale, e.g.
/// `Apr 23, 2016, 10:26:40 AM` in `en_US` or `23.04.2016, 10:26:40` in
/// `de_DE`. Other locales use their numeric date.
fn medium_date_time(locale: Locale) -> &'static str {
    match locale {
        Locale::en_US => "%b %-d, %Y, %X",
        Locale::en_GB | Locale::en_AU | Locale::en_IE => "%-d %b %Y, %X",
        Locale::de_DE | Locale::de_AT | Locale::de_CH => "%d.%m.%Y, %X",
        Locale::fr_FR | Locale::fr_BE | Locale::fr_CH => "%-d %b %Y à %X",
        _ => "%x, %X",
    }
}

/// Number of seconds in an hour.
const SECONDS_PER_HOUR: f64 = 3600.0;

/// A location fix, together with the time at which it was sampled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Location of the device.
    pub location: Location,
    /// Sampling time.
    pub timestamp: DateTime<Utc>,
}

impl Sample {
    /// Samples the given location at the current time.
    pub fn now(location: Location) -> Self {
        Self {
            location,
            timestamp: Utc::now(),
        }
    }
}

/// Texts derived from a [`Sample`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedPayload {
    /// Compact text to encode in the QR code.
    pub encode_text: String,
    /// Three lines of text to show to the user.
    pub display_text: String,
}

/// Formats samples into [`EncodedPayload`]s.
#[derive(Clone, Copy, Debug)]
pub struct PayloadFormatter {
    /// Locale used to render dates.
    locale: Locale,
    /// Offset overriding the system timezone.
    utc_offset: Option<FixedOffset>,
}

impl PayloadFormatter {
    /// Creates a formatter with the given locale. Without an explicit offset,
    /// the system timezone is used.
    pub fn new(locale: Locale, utc_offset: Option<FixedOffset>) -> Self {
        Self { locale, utc_offset }
    }

    /// Creates a formatter using the locale of the environment.
    pub fn from_env(utc_offset: Option<FixedOffset>) -> Self {
        let locale = current_locale();
        debug!("Formatting dates with locale {locale:?}");
        Self::new(locale, utc_offset)
    }

    /// Formats the given sample.
    pub fn format(&self, sample: &Sample) -> EncodedPayload {
        let Location {
            latitude,
            longitude,
        } = sample.location;
        let offset = self.offset_at(&sample.timestamp);
        let timezone_text = offset_text(&offset);

        let encode_text = format!(
            "{latitude}, {longitude} {epoch} {timezone_text}",
            epoch = epoch_millis(&sample.timestamp),
        );

        let formatted_time = sample
            .timestamp
            .with_timezone(&offset)
            .format_localized(medium_date_time(self.locale), self.locale);
        let display_text = format!(
            "LatLong: {latitude:.6}, {longitude:.6}\nTime: {formatted_time}\nTimezone: {timezone_text}"
        );

        EncodedPayload {
            encode_text,
            display_text,
        }
    }

    /// Returns the UTC offset in effect at the given time.
    fn offset_at(&self, timestamp: &DateTime<Utc>) -> FixedOffset {
        self.utc_offset
            .unwrap_or_else(|| *timestamp.with_timezone(&Local).offset())
    }
}

/// Milliseconds since the Unix epoch.
///
/// The fractional seconds are scaled as a float, then truncated. Instants
/// before the epoch saturate to zero.
pub fn epoch_millis(timestamp: &DateTime<Utc>) -> u64 {
    let seconds =
        timestamp.timestamp() as f64 + f64::from(timestamp.timestamp_subsec_nanos()) / 1e9;
    (seconds * 1000.0) as u64
}

/// Renders a UTC offset in hours, e.g. `+2`, `-5`, `+5.5` or `0`.
///
/// Only strictly positive offsets get an explicit `+` sign.
pub fn offset_text(offset: &FixedOffset) -> String {
    let hours = f64::from(offset.local_minus_utc()) / SECONDS_PER_HOUR;
    if hours > 0.0 {
        format!("+{hours}")
    } else {
        format!("{hours}")
    }
}

/// Determines the locale from the `LC_ALL`, `LC_TIME` and `LANG` environment
/// variables, falling back to `en_US`.
fn current_locale() -> Locale {
    ["LC_ALL", "LC_TIME", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|value| !value.is_empty())
        .and_then(|value| parse_locale(&value))
        .unwrap_or(Locale::en_US)
}

/// Parses a POSIX locale name such as `de_DE.UTF-8` or `sr_RS@latin`.
fn parse_locale(name: &str) -> Option<Locale> {
    let name = name.split(['.', '@']).next()?;
    Locale::try_from(name).ok()
}
