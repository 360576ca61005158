mod gpio;
mod i2c;
mod spi;
