// SPDX-License-Identifier: LGPL-3.0-or-later

//! # Domain model and tagfile parsing for Laniakea archive automation
//!
//! This crate consists of the following modules:
//! * [architectures]: Helpers to handle archive architectures
//! * [archive]: Repository/suite/component domain model
//! * [package]: Source and binary package domain model
//! * [identity]: Deterministic content-addressed identifiers
//! * [tagfile]: RFC2822-style stanza parsing (`Packages`, `Sources`)
//! * [release]: `Release`/`InRelease` parsing
//! * [excuses]: `excuses.yaml` ingestion and [SpearsExcuse](excuses::SpearsExcuse) conversion
//! * [spears]: Migration configuration domain types
//! * [synchrotron]: Package synchronization domain types
//! * [debcheck]: `dose` report ingestion
//! * [jobs]: Job, worker and event domain types
//! * [config]: Configuration domain types
//! * [error]: Aggregated parse error taxonomy
//! * [version]: Helpers to handle package versions

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod archive;
pub mod architectures;
pub mod config;
pub mod debcheck;
pub mod error;
pub mod excuses;
pub mod identity;
pub mod jobs;
pub mod package;
pub mod release;
pub mod spears;
pub mod synchrotron;
pub mod tagfile;
mod utils;
pub mod version;

pub use error::ParseError;
