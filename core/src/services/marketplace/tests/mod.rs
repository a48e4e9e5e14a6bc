//! Tests for the marketplace service

#[cfg(test)]
mod access_tests;
#[cfg(test)]
mod booking_tests;
