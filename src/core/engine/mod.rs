pub mod subprocess_engine;
