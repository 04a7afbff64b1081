use hbv96_macros::Series;

#[derive(Debug, Clone, Copy, Series)]
#[series(name = "SnowTable", derive(PartialOrd))]
pub struct SnowValues {
    pub melt: f64,
    pub refr: f64,
}

fn main() {
    let mut table = SnowTable::with_capacity(5);
    table.push(&SnowValues { melt: 1.5, refr: 0.0 });
    assert_eq!(table.len(), 1);
    assert!(table.clone() <= table);
    assert_eq!(SnowValues::field_names(), &["melt", "refr"]);
}
