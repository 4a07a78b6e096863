// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! GNSS Modul of the GPS manager
//!
//! Provides the location platforms for linux based systems: a GPSD client and a
//! simulated source that drives along a fixed route.

pub mod constant_source;
pub mod gpsd_source;
