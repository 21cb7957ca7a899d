pub mod sysinfo_collector;

pub use sysinfo_collector::SysinfoSampleSource;
