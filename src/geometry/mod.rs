pub use self::window::*;

mod window;
