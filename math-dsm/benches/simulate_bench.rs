use criterion::{Criterion, black_box, criterion_group, criterion_main};
use math_audio_dsm::{Modulator, SimulateOptions, SynthesizeNtf, Tf, simulate_dsm, synthesize_ntf};
use ndarray::{Array2, array};

fn sine(n: usize, amplitude: f64) -> Vec<f64> {
    (0..n)
        .map(|k| amplitude * (2.0 * std::f64::consts::PI * k as f64 / 1024.0).sin())
        .collect()
}

/// Second order loop with NTF `(1 - z^-1)^2`: two delaying integrators
/// with feedback 1 and 2.
fn second_order_abcd() -> Array2<f64> {
    array![
        [1.0, 0.0, 1.0, -1.0],
        [1.0, 1.0, 0.0, -2.0],
        [0.0, 1.0, 0.0, 0.0],
    ]
}

fn bench_simulate_ntf(c: &mut Criterion) {
    let input = sine(65536, 0.4);
    for order in [3usize, 5] {
        let ntf: Tf = synthesize_ntf(&SynthesizeNtf {
            order,
            ..SynthesizeNtf::default()
        })
        .unwrap();
        let modulator = Modulator::Ntf(ntf);
        let opts = SimulateOptions::default();
        c.bench_function(&format!("simulate_ntf_order{order}_64k"), |b| {
            b.iter(|| black_box(simulate_dsm(black_box(&input), &modulator, &opts).unwrap()))
        });
    }
}

fn bench_simulate_abcd(c: &mut Criterion) {
    let input = sine(65536, 4.0);
    let modulator = Modulator::Abcd(second_order_abcd());
    let opts = SimulateOptions {
        nlev: 9,
        ..SimulateOptions::default()
    };
    c.bench_function("simulate_abcd_order2_9lev_64k", |b| {
        b.iter(|| black_box(simulate_dsm(black_box(&input), &modulator, &opts).unwrap()))
    });
}

criterion_group!(benches, bench_simulate_ntf, bench_simulate_abcd);
criterion_main!(benches);
