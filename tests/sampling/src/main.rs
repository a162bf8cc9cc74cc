#![no_main]
#![no_std]

// Bring-up check of the resolver inputs: samples both channels a few times per
// second and prints the raw pair with the angle and encoder state it maps to.

use defmt_rtt as _;
use panic_probe as _;

use hal::{self, clocks::Clocks, pac};

use resolver_algo::{
    config::BridgeConfig,
    peripherals::{PeriodicTicker, TickCounter},
    sample_sync::SampleSync,
    timing::StageTimer,
    ResolverBridge,
};
use resolver_drivers::pinout::resolver::{COS_CHANNEL, SIN_CHANNEL};

const SAMPLE_FREQ: u32 = 2;

static SYNC: SampleSync = SampleSync::new(SIN_CHANNEL, COS_CHANNEL);

#[rtic::app(device = pac, peripherals = true)]
mod app {
    use super::*;

    use resolver_drivers::{adc_pair::ResolverAdc, ticker};

    #[shared]
    struct Shared {
        adc: ResolverAdc,
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

        let adc = ResolverAdc::new(dp.ADC2, &clock_cfg);
        let mut ticker = ticker::SampleTicker::new(dp.TIM3, &clock_cfg, SAMPLE_FREQ);
        let bridge = ResolverBridge::new(BridgeConfig::default(), StageTimer::new(&ticker.clock()));
        ticker.begin();

        (Shared { adc }, Local { ticker, bridge })
    }

    #[task(binds = ADC1_2, shared = [adc], local = [bridge], priority = 1)]
    fn on_conversion(mut cx: on_conversion::Context) {
        cx.shared.adc.lock(|adc| SYNC.drain(adc));

        if let Some(raw) = SYNC.take() {
            let bridge = cx.local.bridge;
            let q = bridge.tick(raw, &ticker::TimerCounter);
            defmt::println!(
                "#{} raw: {} calibrated: {} angle: {} rad quadrature: {} ({} us, {} us)",
                SYNC.sample_counter(),
                raw,
                bridge.calibrated(),
                bridge.angle(),
                q,
                bridge.timing().angle_us,
                bridge.timing().quadrature_us
            );
        }
    }

    #[task(binds = TIM3, shared = [adc], local = [ticker], priority = 2)]
    fn on_timer(mut cx: on_timer::Context) {
        if !cx.local.ticker.acknowledge() {
            return;
        }
        defmt::println!("counter: {}", ticker::TimerCounter.now());
        cx.shared.adc.lock(|adc| SYNC.on_tick(adc));
    }
}

#[defmt::panic_handler]
fn panic() -> ! {
    cortex_m::asm::udf()
}
