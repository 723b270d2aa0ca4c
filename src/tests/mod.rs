//! End-to-end tests over synthesised Keynote packages

mod fixture;
