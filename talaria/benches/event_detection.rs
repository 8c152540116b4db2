use criterion::{black_box, criterion_group, criterion_main, Criterion};

use talaria::{EventData, NtEvent, TEvent};

/// Taylor coefficients of `sin(omega * s)` up to the given order: several
/// well-separated roots inside the unit step keep the isolator busy.
fn sine_coefficients(omega: f64, order: usize) -> Vec<f64> {
    let mut coeffs = vec![0.0; order + 1];
    let mut fact = 1.0;
    let mut pow = 1.0;
    for (k, c) in coeffs.iter_mut().enumerate() {
        if k > 0 {
            fact *= k as f64;
            pow *= omega;
        }
        *c = match k % 4 {
            1 => pow / fact,
            3 => -pow / fact,
            _ => 0.0,
        };
    }
    coeffs
}

fn bench_detect_events(c: &mut Criterion) {
    let order = 20;
    let span = order + 1;

    let mut ed = EventData::<f64>::new(vec![], vec![NtEvent::new(0)], order, 0).unwrap();
    ed.jet_mut().copy_from_slice(&sine_coefficients(7.0, order));
    c.bench_function("detect_events/three_roots", |b| {
        b.iter(|| {
            ed.detect_events(0.0, black_box(1.0), 1e-16);
            black_box(ed.detected_nonterminal().len())
        })
    });

    let mut ed = EventData::<f64>::new(vec![TEvent::new(0)], vec![], order, 0).unwrap();
    ed.jet_mut()[..span].copy_from_slice(&sine_coefficients(7.0, order));
    c.bench_function("detect_events/terminal", |b| {
        b.iter(|| {
            ed.detect_events(0.0, black_box(1.0), 1e-16);
            black_box(ed.detected_terminal().len())
        })
    });

    // All-positive coefficients (an exp-like series): the fast exclusion
    // check short-circuits before any isolation work.
    let mut ed = EventData::<f64>::new(vec![], vec![NtEvent::new(0)], order, 0).unwrap();
    let mut coeffs = vec![0.0; span];
    let mut fact = 1.0;
    for (k, c) in coeffs.iter_mut().enumerate() {
        if k > 0 {
            fact *= k as f64;
        }
        *c = 1.0 / fact;
    }
    ed.jet_mut().copy_from_slice(&coeffs);
    c.bench_function("detect_events/excluded", |b| {
        b.iter(|| {
            ed.detect_events(0.0, black_box(1.0), 1e-16);
            black_box(ed.detected_nonterminal().len())
        })
    });
}

criterion_group!(benches, bench_detect_events);
criterion_main!(benches);
