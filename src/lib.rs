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

#![deny(unused_must_use)]

pub mod access_log;
pub mod cli;
pub mod config;
pub mod exchange;
pub mod filters;
pub mod generated;
pub mod metrics;
pub mod runtime;


pub type Result<T, E = eyre::Error> = std::result::Result<T, E>;

#[doc(inline)]
pub use self::{
    access_log::{AccessLog, AccessLogDispatcher},
    cli::Cli,
    config::Config,
    exchange::{Exchange, ExchangeRecord, Protocol},
    filters::{FilterEvaluator, PredicateNode},
    runtime::{Runtime, RuntimeKeyStore},
};
