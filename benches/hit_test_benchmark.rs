use criterion::{Criterion, black_box, criterion_group, criterion_main};
use screen_graph::StateMachine;
use screen_graph::scenario::load_str;

/// A chain of screens, each with a grid of dead regions before the live one
fn chain_scenario(states: usize, regions: usize) -> String {
    let mut yaml = String::from("test_name: bench\ninstruction: walk the chain\nstates:\n");
    for i in 0..states {
        yaml.push_str(&format!("  - id: s{}\n    screenshot: s{}.png\n", i, i));
        if i + 1 == states {
            yaml.push_str("    is_terminal: true\n");
            continue;
        }
        yaml.push_str("    transitions:\n");
        for r in 0..regions {
            let x = (r as i32 % 10) * 100;
            let y = (r as i32 / 10) * 100;
            yaml.push_str(&format!(
                "      - {{ click_region: [{}, {}, {}, {}], next_state: s{} }}\n",
                x,
                y,
                x + 50,
                y + 50,
                i
            ));
        }
        yaml.push_str(&format!(
            "      - {{ click_region: [2000, 2000, 2100, 2100], next_state: s{} }}\n",
            i + 1
        ));
    }
    yaml
}

fn benchmark_hit_test(c: &mut Criterion) {
    let scenario = load_str(&chain_scenario(20, 50), ".").unwrap();
    let machine = StateMachine::from_scenario(&scenario).unwrap();

    c.bench_function("tap_walk_chain", |b| {
        b.iter(|| {
            let mut m = machine.clone();
            while m.handle_tap(black_box(2050), black_box(2050)) {}
            assert_eq!(m.current_state_id(), "s19");
        })
    });

    c.bench_function("tap_miss", |b| {
        let mut m = machine.clone();
        b.iter(|| {
            m.reset();
            m.handle_tap(black_box(75), black_box(75))
        });
    });
}

criterion_group!(benches, benchmark_hit_test);
criterion_main!(benches);
