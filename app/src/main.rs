#![no_main]
#![no_std]

use defmt_rtt as _;
use panic_probe as _;

use core::ptr::addr_of_mut;

use hal::{self, clocks::Clocks, pac};

use resolver_algo::{
    config::BridgeConfig,
    peripherals::{AnalogSampler, PeriodicTicker, TelemetryExporter},
    sample_sync::SampleSync,
    telemetry::{ScopeTable, TelemetryBlock},
    timing::StageTimer,
    ResolverBridge,
};
use resolver_drivers::pinout::resolver::{COS_CHANNEL, SIN_CHANNEL};

/// Sampling rate of the resolver channels in Hz
const SAMPLE_FREQ: u32 = 10_000;

static SYNC: SampleSync = SampleSync::new(SIN_CHANNEL, COS_CHANNEL);

/// Telemetry block read and written by the debug probe.
#[no_mangle]
static mut RESOLVER_SCOPE: TelemetryBlock = TelemetryBlock::new();

#[rtic::app(device = pac, peripherals = true)]
mod app {
    use super::*;

    use resolver_drivers::*;

    #[shared]
    struct Shared {
        adc: adc_pair::ResolverAdc,
    }

    #[local]
    struct Local {
        ticker: ticker::SampleTicker,
        bridge: ResolverBridge,
    }

    #[init]
    fn init(ctx: init::Context) -> (Shared, Local) {
        let dp = ctx.device;
        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();

        let sysclk_freq = clock_cfg.sysclk(); // System clock frequency in Hz
        defmt::debug!("SYSTEM: Clock frequency is {} MHz", sysclk_freq / 1000000);

        let adc = adc_pair::ResolverAdc::new(dp.ADC2, &clock_cfg);

        let mut ticker = ticker::SampleTicker::new(dp.TIM3, &clock_cfg, SAMPLE_FREQ);
        let stage_timer = StageTimer::new(&ticker.clock());
        defmt::debug!(
            "SAMPLING: {} Hz, {} ticks per period, {} us per tick",
            SAMPLE_FREQ,
            stage_timer.period(),
            stage_timer.tick_us()
        );

        let config = BridgeConfig::default();
        defmt::info!("BRIDGE: start-up configuration {}", config);
        let bridge = ResolverBridge::new(config, stage_timer);

        ticker.begin();

        (Shared { adc }, Local { ticker, bridge })
    }

    #[idle(shared = [adc], local = [bridge])]
    fn idle(mut cx: idle::Context) -> ! {
        let bridge = cx.local.bridge;
        // Note(unsafe): the block is only accessed through this table and the debug probe
        let mut scope = unsafe { ScopeTable::new(addr_of_mut!(RESOLVER_SCOPE), bridge) };
        let counter = ticker::TimerCounter;

        loop {
            // Failsafe in case a conversion interrupt was missed
            cx.shared.adc.lock(|adc| SYNC.drain(adc));

            match SYNC.take() {
                Some(raw) => {
                    bridge.tick(raw, &counter);
                }
                None => cx.shared.adc.lock(|adc| adc.trigger()),
            }

            scope.service(bridge, SYNC.sample_counter());
        }
    }

    #[task(binds = TIM3, shared = [adc], local = [ticker], priority = 1)]
    fn on_sample_tick(mut cx: on_sample_tick::Context) {
        if !cx.local.ticker.acknowledge() {
            return;
        }
        cx.shared.adc.lock(|adc| SYNC.on_tick(adc));
    }

    #[task(binds = ADC1_2, shared = [adc], priority = 1)]
    fn on_conversion(mut cx: on_conversion::Context) {
        cx.shared.adc.lock(|adc| SYNC.drain(adc));
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
