//! Rule 184 Traffic Simulation Library
//!
//! A multi-lane, multi-road cellular-automaton traffic engine that runs
//! headless and is driven one generation at a time.

pub mod simulation;
