pub mod backup;
pub mod locker;
pub mod repositories;
