pub mod generate_config;
pub mod psnr;
pub mod run_config;
pub mod test;
pub mod test_single;
pub mod train;

pub use self::generate_config::generate_config;
pub use self::psnr::psnr;
pub use self::run_config::resolve_config;
pub use self::test::test;
pub use self::test_single::test_single;
pub use self::train::train;
