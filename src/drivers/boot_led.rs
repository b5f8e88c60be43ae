//! Boot-indicator LED.
//!
//! The LED flares at full brightness while the firmware boots and drops to
//! a barely visible idle glow shortly after, driven by a 4 kHz LEDC PWM
//! channel so the dim level is flicker-free.

use std::thread;
use std::time::Duration;

use esp_idf_hal::gpio::AnyOutputPin;
use esp_idf_hal::ledc::{config::TimerConfig, LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;

use crate::error::{Error, Result};

/// Idle duty after the boot flash (out of the 10-bit range).
const IDLE_DUTY: u32 = 1;
/// How long the LED stays bright after power-up.
const BOOT_FLASH: Duration = Duration::from_millis(100);

/// Configure the LED channel at full brightness and spawn the dimmer.
pub fn start<T, C>(
    timer: impl Peripheral<P = T> + 'static,
    channel: impl Peripheral<P = C> + 'static,
    pin: AnyOutputPin,
) -> Result<()>
where
    T: LedcTimer + 'static,
    C: LedcChannel + 'static,
{
    let timer = LedcTimerDriver::new(
        timer,
        &TimerConfig::new()
            .frequency(Hertz(4000))
            .resolution(esp_idf_hal::ledc::Resolution::Bits10),
    )
    .map_err(|_| Error::Init("LEDC timer"))?;

    let mut led =
        LedcDriver::new(channel, timer, pin).map_err(|_| Error::Init("LEDC channel"))?;
    let max = led.get_max_duty();
    led.set_duty(max).map_err(|_| Error::Init("LEDC duty"))?;

    thread::Builder::new()
        .name("boot-led".into())
        .spawn(move || {
            thread::sleep(BOOT_FLASH);
            if led.set_duty(IDLE_DUTY).is_err() {
                log::warn!("boot LED dim failed");
            }
        })
        .map_err(|_| Error::Init("boot LED task"))?;

    Ok(())
}
