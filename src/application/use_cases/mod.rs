pub mod test_generation;
