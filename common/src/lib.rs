// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the GPS manager
//!
//! Provides the common data types that are shared between the manager, the location
//! platforms and the front-ends.

pub mod error;
pub mod notification;
pub mod position;
pub mod reading;
pub mod request;
pub mod serde;
pub mod test_helper;
pub mod time_source;
