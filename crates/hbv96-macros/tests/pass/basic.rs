use hbv96_macros::Series;

#[derive(Debug, Clone, Copy, PartialEq, Series)]
pub struct StepValues {
    pub rf: f64,
    pub sf: f64,
    pub gw: f64,
}

fn main() {
    let row = StepValues { rf: 1.0, sf: 2.0, gw: 3.0 };
    let mut table = StepValuesSeries::with_capacity(10);
    assert!(table.is_empty());
    table.push(&row);
    assert_eq!(table.len(), 1);
    assert_eq!(table.get(0), Some(row));
    assert_eq!(table.get(1), None);
    assert_eq!(table.column("gw"), Some(&[3.0][..]));
    assert_eq!(table.column("missing"), None);
    assert_eq!(StepValues::field_names(), &["rf", "sf", "gw"]);
}
