pub mod alarm;
pub mod clock;
pub mod sensor;
pub mod worker;
