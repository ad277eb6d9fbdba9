/*
 * Copyright 2024 Google LLC
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use once_cell::sync::Lazy;
use prometheus::{IntCounter, IntCounterVec};

use crate::metrics::{opts, CollectorExt, ACCESS_LOG_LABEL};

const SUBSYSTEM: &str = "access_log";

fn counter_vec(name: &str, description: &str) -> IntCounterVec {
    IntCounterVec::new(opts(name, SUBSYSTEM, description), &[ACCESS_LOG_LABEL])
        .and_then(CollectorExt::register_if_not_exists)
        .unwrap()
}

pub(crate) fn entries_logged(access_log: &str) -> IntCounter {
    static ENTRIES_LOGGED: Lazy<IntCounterVec> = Lazy::new(|| {
        counter_vec(
            "entries_logged_total",
            "Total number of records that passed the filter and were written",
        )
    });

    ENTRIES_LOGGED.with_label_values(&[access_log])
}

pub(crate) fn entries_filtered(access_log: &str) -> IntCounter {
    static ENTRIES_FILTERED: Lazy<IntCounterVec> = Lazy::new(|| {
        counter_vec(
            "entries_filtered_total",
            "Total number of records rejected by the access log filter",
        )
    });

    ENTRIES_FILTERED.with_label_values(&[access_log])
}

pub(crate) fn sink_errors(access_log: &str) -> IntCounter {
    static SINK_ERRORS: Lazy<IntCounterVec> = Lazy::new(|| {
        counter_vec(
            "sink_errors_total",
            "Total number of records that could not be written, including panics",
        )
    });

    SINK_ERRORS.with_label_values(&[access_log])
}
