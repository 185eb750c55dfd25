pub mod guard;

pub use guard::GuardService;
