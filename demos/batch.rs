use propsi::{BatchRequest, Facade, FacadeConfig, SENTINEL};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let facade = Facade::new(FacadeConfig::from_env());

    // ── Scalar queries: SI units throughout ─────────────────────────
    let t_boil = facade.props_si("T", "P", 101_325.0, "Q", 0.0, "Water")?;
    println!("Water boils at {t_boil:.2} K under 1 atm");

    let tc = facade.props1("Water", "Tcrit")?;
    println!("Water critical temperature: {tc:.3} K");

    let rho = facade.props_si("Dmass", "T", 300.0, "P", 101_325.0, "Nitrogen[0.79]&Oxygen[0.21]")?;
    println!("Synthetic air at 300 K, 1 atm: {rho:.4} kg/m³");

    // ── Batch: three outputs along an isobar ────────────────────────
    let temperatures = [300.0, 350.0, 400.0, 450.0, 500.0];
    let req = BatchRequest {
        outputs: "Hmass&Smass&Dmass",
        name1: "T",
        prop1: &temperatures,
        name2: "P",
        prop2: &[1e5],
        backend: "",
        fluids: "Water",
        fractions: &[],
    };
    let grid = facade.props_si_multi(&req)?;

    println!("\nWater at 1 bar:");
    println!("{:>8} {:>14} {:>12} {:>12}", "T [K]", "h [J/kg]", "s [J/kg/K]", "ρ [kg/m³]");
    for (col, t) in temperatures.iter().enumerate() {
        let cell = |row| match grid.get(row, col) {
            Some(v) if v != SENTINEL => format!("{v:.3}"),
            _ => "-".to_string(),
        };
        println!("{t:>8.1} {:>14} {:>12} {:>12}", cell(0), cell(1), cell(2));
    }

    Ok(())
}
