mod headless;

pub use headless::start;
