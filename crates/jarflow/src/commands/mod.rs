pub mod classpath;
pub mod pipeline;
pub mod tasks;
pub mod validate;
