//! In-memory registry for engine tests.
