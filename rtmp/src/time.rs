//! RTMP timestamps are 32 bit millisecond counters from an unspecified epoch.
//!
//! Live streams can outlast the ~49.7 days a `u32` millisecond counter covers, so all
//! arithmetic wraps and comparisons treat two values as adjacent when they are within
//! 2<sup>31</sup> - 1 milliseconds of each other.
//!
//! ```
//! use rtmp_engine::time::RtmpTimestamp;
//!
//! let early = RtmpTimestamp::new(u32::MAX - 5);
//! let late = early + 10;
//!
//! assert_eq!(late, 4);
//! assert!(early < late);
//! assert_eq!((late - early).value, 10);
//! ```

use std::cmp::Ordering;
use std::num::Wrapping;
use std::ops::{Add, Sub};
use std::time::Duration;

const MAX_ADJACENT_VALUE: u32 = 2_147_483_647;

/// A wrapping millisecond timestamp as carried in RTMP chunk headers
#[derive(Eq, PartialEq, Debug, Copy, Clone, Default, Hash)]
pub struct RtmpTimestamp {
    pub value: u32,
}

impl RtmpTimestamp {
    pub fn new(value: u32) -> Self {
        RtmpTimestamp { value }
    }

    pub fn set(&mut self, value: u32) {
        self.value = value;
    }

    /// Converts a media time into a timestamp, wrapping every 2<sup>32</sup> milliseconds
    pub fn from_duration(duration: Duration) -> Self {
        RtmpTimestamp {
            value: (duration.as_millis() % (1_u128 << 32)) as u32,
        }
    }

    pub fn as_duration(self) -> Duration {
        Duration::from_millis(self.value as u64)
    }

    /// Signed distance from `earlier` to `self`, honoring wrap-around
    pub fn signed_delta_from(self, earlier: RtmpTimestamp) -> i64 {
        let forward = (Wrapping(self.value) - Wrapping(earlier.value)).0;
        if forward <= MAX_ADJACENT_VALUE {
            forward as i64
        } else {
            -((Wrapping(earlier.value) - Wrapping(self.value)).0 as i64)
        }
    }
}

impl Add for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: RtmpTimestamp) -> Self {
        self + other.value
    }
}

impl Add<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn add(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) + Wrapping(other)).0)
    }
}

impl Sub for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: RtmpTimestamp) -> Self {
        self - other.value
    }
}

impl Sub<u32> for RtmpTimestamp {
    type Output = RtmpTimestamp;

    fn sub(self, other: u32) -> Self {
        RtmpTimestamp::new((Wrapping(self.value) - Wrapping(other)).0)
    }
}

impl Ord for RtmpTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        compare(self.value, other.value)
    }
}

impl PartialOrd for RtmpTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq<u32> for RtmpTimestamp {
    fn eq(&self, other: &u32) -> bool {
        self.value == *other
    }
}

impl PartialOrd<u32> for RtmpTimestamp {
    fn partial_cmp(&self, other: &u32) -> Option<Ordering> {
        Some(compare(self.value, *other))
    }
}

fn compare(value1: u32, value2: u32) -> Ordering {
    let difference = value1.max(value2) - value1.min(value2);
    if difference <= MAX_ADJACENT_VALUE {
        value1.cmp(&value2)
    } else {
        value2.cmp(&value1)
    }
}
