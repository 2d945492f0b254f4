//! On-target harness wiring check for xtensa/ESP32: boots the RTOS, runs the
//! embassy executor, and exercises timers before any radio work is attempted.

#![no_std]
#![no_main]

#[cfg(test)]
#[embedded_test::tests(executor = esp_rtos::embassy::Executor::new())]
mod tests {
    #[init]
    fn init() {
        let peripherals = esp_hal::init(esp_hal::Config::default());
        let timg0 = esp_hal::timer::timg::TimerGroup::new(peripherals.TIMG0);
        esp_rtos::start(timg0.timer0);
    }

    #[test]
    async fn timers_advance_under_the_executor() {
        let before = embassy_time::Instant::now();
        embassy_time::Timer::after(embassy_time::Duration::from_millis(10)).await;
        assert!(before.elapsed() >= embassy_time::Duration::from_millis(10));
    }
}
