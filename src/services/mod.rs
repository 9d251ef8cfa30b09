pub mod value_source;
