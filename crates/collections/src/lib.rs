pub use self::min_max_record::*;

mod min_max_record;
