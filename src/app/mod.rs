pub(crate) mod config;
mod net;
mod serial;

use esp_hal::{
    timer::timg::TimerGroup,
    uart::{Config as UartConfig, Uart},
};
use esp_println::println;

use self::config::UART_BAUD;

pub(crate) fn run() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // The radio driver allocates its internal state on the heap.
    esp_alloc::heap_allocator!(size: 72 * 1024);

    let uart_cfg = UartConfig::default().with_baudrate(UART_BAUD);
    let uart = Uart::new(peripherals.UART0, uart_cfg)
        .expect("failed to init UART0")
        .with_rx(peripherals.GPIO3)
        .with_tx(peripherals.GPIO1)
        .into_async();

    let runtime = match net::setup(peripherals.WIFI, peripherals.FLASH) {
        Ok(runtime) => runtime,
        Err(err) => {
            println!("{}", err);
            halt_forever()
        }
    };

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(net::connection_task(runtime));
        spawner.must_spawn(serial::provisioning_task(uart));
    });
}

// Upstream Executor::run wants 'static; the executor lives on this stack
// frame forever because run() never returns.
unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}

fn halt_forever() -> ! {
    loop {
        core::hint::spin_loop();
    }
}
