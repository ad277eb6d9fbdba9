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

//! Protobuf messages for the subset of the Envoy v3 API accepted as binary
//! access log configuration.

#![allow(
    clippy::doc_markdown,
    clippy::use_self,
    clippy::enum_variant_names,
    clippy::large_enum_variant
)]

pub mod envoy {
    pub mod config {
        pub mod accesslog {
            pub mod v3;
        }
        pub mod core {
            pub mod v3;
        }
        pub mod route {
            pub mod v3;
        }
    }
    pub mod extensions {
        pub mod access_loggers {
            pub mod file {
                pub mod v3;
            }
        }
    }
    pub mod kind {
        pub mod matcher {
            pub mod v3;
        }
        pub mod v3;
    }
}
