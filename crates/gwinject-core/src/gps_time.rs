//! GPS time and Earth rotation
//!
//! Antenna patterns depend on where a detector points at the trigger instant,
//! which is fixed by the Greenwich mean sidereal time (GMST). GPS time has no
//! leap seconds, while sidereal time follows UTC, so the conversion walks the
//! leap-second table first.
//!
//! # Time Domains
//!
//! - **GPS Time**: seconds since 1980-01-06 00:00:00 UTC, continuous
//! - **UTC Time**: GPS time minus accumulated leap seconds
//! - **GMST**: Earth rotation angle relative to the vernal equinox (IAU 1982)

use std::f64::consts::PI;

use crate::types::GpsSeconds;

/// GPS time of J2000.0 expressed as 2000-01-01 12:00:00 UTC
const GPS_J2000_UTC: f64 = 630_763_213.0;

/// GPS-UTC offset in effect at J2000
const LEAP_SECONDS_AT_J2000: i32 = 13;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Days in a Julian century
const JULIAN_CENTURY_DAYS: f64 = 36_525.0;

/// GPS instants at which a leap second took effect.
const LEAP_SECOND_TABLE: [i64; 18] = [
    46_828_800,    // 1981-07-01
    78_364_801,    // 1982-07-01
    109_900_802,   // 1983-07-01
    173_059_203,   // 1985-07-01
    252_028_804,   // 1988-01-01
    315_187_205,   // 1990-01-01
    346_723_206,   // 1991-01-01
    393_984_007,   // 1992-07-01
    425_520_008,   // 1993-07-01
    457_056_009,   // 1994-07-01
    504_489_610,   // 1996-01-01
    551_750_411,   // 1997-07-01
    599_184_012,   // 1999-01-01
    820_108_813,   // 2006-01-01
    914_803_214,   // 2009-01-01
    1_025_136_015, // 2012-07-01
    1_119_744_016, // 2015-07-01
    1_167_264_017, // 2017-01-01
];

/// GPS-UTC offset (leap seconds accumulated since the GPS epoch) at `gps`.
pub fn leap_seconds(gps: GpsSeconds) -> i32 {
    LEAP_SECOND_TABLE
        .iter()
        .take_while(|&&t| gps >= t as f64)
        .count() as i32
}

/// Convert GPS seconds to UTC seconds elapsed since J2000 (noon UTC).
pub fn utc_seconds_since_j2000(gps: GpsSeconds) -> f64 {
    gps - GPS_J2000_UTC - f64::from(leap_seconds(gps) - LEAP_SECONDS_AT_J2000)
}

/// Greenwich mean sidereal time in radians, in `[0, 2π)`.
pub fn greenwich_mean_sidereal_time(gps: GpsSeconds) -> f64 {
    let s = utc_seconds_since_j2000(gps);
    let t = s / (SECONDS_PER_DAY * JULIAN_CENTURY_DAYS);

    // IAU 1982; the linear 876600 h/century term is s itself
    let gmst_sec =
        67_310.548_41 + s + t * (8_640_184.812_866 + t * (0.093_104 - 6.2e-6 * t));

    gmst_sec.rem_euclid(SECONDS_PER_DAY) * (2.0 * PI / SECONDS_PER_DAY)
}
