pub mod avatar;
pub mod button;
pub mod flash;
pub mod heading;
pub mod nav;
