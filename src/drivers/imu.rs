// SmartWake - MPU6050 Accelerometer Driver
//
// Register-level driver over the shared I2C bus. Only the accelerometer is
// used; the chip is put to sleep whenever the scheduler is not recording.

use std::sync::Mutex;

use esp_idf_hal::i2c::I2cDriver;

use smartwake::config::*;
use smartwake::events::MotionReading;

/// Thread-safe handle to a shared I2C bus.
pub type SharedBus = &'static Mutex<I2cDriver<'static>>;

// MPU6050 register addresses
const REG_SMPLRT_DIV: u8 = 0x19;
const REG_CONFIG: u8 = 0x1A;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B; // Start of 6-byte accel burst
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_PWR_MGMT_2: u8 = 0x6C;
const REG_WHO_AM_I: u8 = 0x75;
const WHO_AM_I_EXPECTED: u8 = 0x68;

const PWR_SLEEP: u8 = 0x40;
const PWR_CLK_PLL_X: u8 = 0x01;
const PWR2_GYRO_STANDBY: u8 = 0x07;

pub struct Mpu6050 {
    bus: SharedBus,
}

impl Mpu6050 {
    pub fn new(bus: SharedBus) -> Self {
        Self { bus }
    }

    /// Verify the device is reachable on the I2C bus.
    pub fn is_connected(&self) -> bool {
        let mut bus = self.bus.lock().unwrap();
        let mut buf = [0u8; 1];
        match bus.write_read(I2C_ADDR_MPU6050, &[REG_WHO_AM_I], &mut buf, I2C_TIMEOUT_TICKS) {
            Ok(()) => buf[0] == WHO_AM_I_EXPECTED,
            Err(_) => false,
        }
    }

    /// Configure accel (±2 g), DLPF 21 Hz, gyro in standby, then sleep until
    /// recording starts.
    pub fn init(&self) -> anyhow::Result<()> {
        {
            let mut bus = self.bus.lock().unwrap();

            bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_1, PWR_CLK_PLL_X], I2C_TIMEOUT_TICKS)?;

            // DLPF bandwidth 21 Hz, 1 kHz internal rate / (1 + 99) = 10 Hz
            bus.write(I2C_ADDR_MPU6050, &[REG_CONFIG, 0x04], I2C_TIMEOUT_TICKS)?;
            bus.write(I2C_ADDR_MPU6050, &[REG_SMPLRT_DIV, 99], I2C_TIMEOUT_TICKS)?;

            // Accelerometer: ±2 g
            bus.write(I2C_ADDR_MPU6050, &[REG_ACCEL_CONFIG, 0x00], I2C_TIMEOUT_TICKS)?;

            bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_2, PWR2_GYRO_STANDBY], I2C_TIMEOUT_TICKS)?;
        }

        self.set_sleep(true)?;
        log::info!("MPU6050 initialised (±2g, DLPF 21Hz, gyro standby)");
        Ok(())
    }

    /// Sleep (true) or wake (false) the sensor.
    pub fn set_sleep(&self, sleep: bool) -> anyhow::Result<()> {
        let value = if sleep { PWR_SLEEP | PWR_CLK_PLL_X } else { PWR_CLK_PLL_X };
        let mut bus = self.bus.lock().unwrap();
        bus.write(I2C_ADDR_MPU6050, &[REG_PWR_MGMT_1, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }

    /// Burst-read the three accel axes in milli-g.
    pub fn read_motion(&self) -> anyhow::Result<MotionReading> {
        let mut bus = self.bus.lock().unwrap();
        let mut raw = [0u8; 6];
        bus.write_read(I2C_ADDR_MPU6050, &[REG_ACCEL_XOUT_H], &mut raw, I2C_TIMEOUT_TICKS)?;

        let mg = |hi: u8, lo: u8| (i16::from_be_bytes([hi, lo]) as f32 / ACCEL_SCALE_2G) as i16;
        Ok(MotionReading::new(
            mg(raw[0], raw[1]),
            mg(raw[2], raw[3]),
            mg(raw[4], raw[5]),
        ))
    }
}
