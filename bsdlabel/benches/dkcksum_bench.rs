// cargo bench -p bsdlabel
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use zerocopy::FromZeros;

use bsdlabel::disklabel::{dkcksum, Disklabel, BSD_DISKMAGIC};

criterion_group!(benches, bench_dkcksum);
criterion_main!(benches);

fn make_label(live: u16) -> Disklabel {
    let mut d = Disklabel::new_zeroed();
    d.magic = BSD_DISKMAGIC;
    d.magic2 = BSD_DISKMAGIC;
    d.secsize = 512;
    d.nsectors = 63;
    d.ntracks = 16;
    d.ncylinders = 1024;
    d.secpercyl = 1008;
    d.secperunit = 1_032_192;
    d.npartitions = live;
    for i in 0..live as usize {
        d.partitions[i].offset = (i as u32) * 4096;
        d.partitions[i].size = 4096;
    }
    d
}

fn bench_dkcksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("dkcksum");
    for &live in &[0u16, 8, 16] {
        let d = make_label(live);
        group.bench_with_input(BenchmarkId::new("live_slots", live), &d, |b, d| {
            b.iter(|| std::hint::black_box(dkcksum(d)));
        });
    }
    group.finish();
}
