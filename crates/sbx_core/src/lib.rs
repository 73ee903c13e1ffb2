pub mod dds;
pub mod hot_reload;
pub mod input;
pub mod math;
pub mod mesh;
pub mod obj;
pub mod shapes;
pub mod time;
pub mod watcher;
