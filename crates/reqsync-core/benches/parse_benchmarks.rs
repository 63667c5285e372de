use criterion::{Criterion, black_box, criterion_group, criterion_main};
use reqsync_core::parse::{parse_line, split_lines};
use reqsync_core::policy::{CapStrategy, Policy, apply_policy};

const FIXTURE: &str = "\
# runtime
-r base.txt
--index-url https://pypi.org/simple
pandas>=1.0.0
numpy==1.26.4  # pinned for abi
requests[socks,security]>=2.0,<3; python_version >= \"3.8\"
-e git+https://github.com/org/repo.git#egg=repo
./vendor/local-pkg
Django (>=4.0,!=4.1.2)
";

fn parse_file_benchmark(c: &mut Criterion) {
    let text = FIXTURE.repeat(50);

    c.bench_function("parse::parse_line (450 lines)", |b| {
        b.iter(|| {
            for line in split_lines(black_box(&text)) {
                black_box(parse_line(line));
            }
        })
    });
}

fn apply_policy_benchmark(c: &mut Criterion) {
    let parsed = parse_line("requests[socks]>=2.0,<3,!=2.1.0; python_version >= \"3.8\"\n");
    let req = parsed.requirement().unwrap().clone();
    let cap = CapStrategy::default();

    for policy in Policy::ALL {
        c.bench_function(&format!("policy::apply_policy ({policy})"), |b| {
            b.iter(|| {
                apply_policy(black_box(&req), black_box("2.32.3"), policy, false, false, &cap).unwrap()
            })
        });
    }
}

criterion_group!(benches, parse_file_benchmark, apply_policy_benchmark);
criterion_main!(benches);
