// Unless explicitly stated otherwise all files in this repository are licensed
// under the Apache License Version 2.0.
// This product includes software developed at Datadog (https://www.datadoghq.com/).
// Copyright 2026-present Datadog, Inc.

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Utc};

/// Source of wall-clock time for sampling timestamps and partition rollover.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// UTC offset of the host's local time zone at `at`. Partition names use
    /// local wall-clock hours.
    fn local_offset(&self, at: DateTime<Utc>) -> FixedOffset;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self, at: DateTime<Utc>) -> FixedOffset {
        Local.offset_from_utc_datetime(&at.naive_utc()).fix()
    }
}
