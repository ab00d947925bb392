// src/schema/fields.rs

use serde::{Deserialize, Serialize};

use crate::process::columns::AliasTable;

/// Semantic columns of the production-schedule sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleField {
    MaterialCode,
    OrderCode,
    Description,
    SizeCode,
    Family,
    StartDate,
    EndDate,
    FinalEndDate,
    Weekday,
    PlannedQuantity,
    ReportedQuantity,
    Pieces,
    LinearMass,
    RealVsPlanned,
    CampaignQuantity,
    Productivity,
    NominalProductivity,
    UtilizationIndex,
    EfficiencyIndex,
    SetupMinutes,
    DelaysGains,
    ScheduledStops,
    Billets,
    SteelGrade,
    RawMaterialCode,
    RawMaterialDescription,
    BilletOrigin,
    Destination,
    BacklogNextMonth,
    BacklogFuture,
    BacklogOverdue,
    ProductionVsBacklog,
}

/// Header labels seen across schedule revisions, most preferred first.
pub fn schedule_aliases() -> AliasTable<ScheduleField> {
    use ScheduleField::*;
    AliasTable::new()
        .with(MaterialCode, &["Código SAP", "Código SAP2", "SAP", "Codigo SAP2"])
        .with(OrderCode, &["OP", "Ordem"])
        .with(Description, &["Descrição", "Descricao"])
        .with(SizeCode, &["Bitolas", "Bitola", "BITOLA", "Dimensão"])
        .with(Family, &["Familia", "Família"])
        .with(StartDate, &["Início", "Inicio", "Data", "Data Início"])
        .with(EndDate, &["Término", "Termino", "Data Término"])
        .with(FinalEndDate, &["Termino Final", "Término Final"])
        .with(Weekday, &["Dia da Semana"])
        .with(
            PlannedQuantity,
            &[
                "Qtde REAL (t)",
                "Prod. Acab. (t)",
                "Producao",
                "Produção",
                "Qtd. Planejada",
                "Quantidade",
            ],
        )
        .with(ReportedQuantity, &["Produção Apontada"])
        .with(Pieces, &["Peças", "Pecas"])
        .with(LinearMass, &["Massa Linear", "Massa"])
        .with(RealVsPlanned, &["Real - Prev", "Real Prev", "Real - Prev."])
        .with(CampaignQuantity, &["Qtd Campanha"])
        .with(
            Productivity,
            &["Produtividade", "Produtividade (t/h)", "Produt. Plan t/h"],
        )
        .with(NominalProductivity, &["Produt. Nom t/h"])
        .with(UtilizationIndex, &["IU", "IU (%)"])
        .with(EfficiencyIndex, &["IE", "IE (%)"])
        .with(SetupMinutes, &["Setup", "Tempo Setup"])
        .with(DelaysGains, &["Atrasos/ Ganhos"])
        .with(
            ScheduledStops,
            &["Paradas Progr", "Paradas Programadas", "Paradas Progr."],
        )
        .with(Billets, &["Tarugos (t)"])
        .with(SteelGrade, &["Aço", "Aco"])
        .with(RawMaterialCode, &["Código MP", "Codigo MP"])
        .with(RawMaterialDescription, &["Descrição MP"])
        .with(BilletOrigin, &["Origem Tarugos"])
        .with(Destination, &["Destino"])
        .with(BacklogNextMonth, &["Cart. M1"])
        .with(BacklogFuture, &["Cart. Futura"])
        .with(BacklogOverdue, &["Cart. Atraso+ M0", "Cart. Atraso+M0"])
        .with(ProductionVsBacklog, &["Prod - Cart. Total"])
}

/// Semantic columns of the material-master (targets) sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaterialField {
    MaterialCode,
    SizeCode,
    Family,
    LinearMass,
    GasTarget,
    EnergyTarget,
    MetallicYield,
}

pub fn material_aliases() -> AliasTable<MaterialField> {
    use MaterialField::*;
    AliasTable::new()
        .with(MaterialCode, &["Código SAP2", "SAP", "sap"])
        .with(SizeCode, &["Bitola", "BITOLA"])
        .with(Family, &["Família", "FAMILIA"])
        .with(LinearMass, &["MASSA LINEAR"])
        .with(GasTarget, &["GN", "Meta Gás", "gas"])
        .with(EnergyTarget, &["EE", "Meta Energia", "energia"])
        .with(MetallicYield, &["RM", "Rendimento", "rm"])
}

/// Columns of the three energy-log sheets. Labels are matched exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnergyField {
    RollingOutput,
    Tl02Output,
    GasTl01,
    GasTl02,
    GasCalorificValue,
    SwitchgearInput,
    WaterPlant,
    OverheadCrane,
}

pub fn energy_aliases() -> AliasTable<EnergyField> {
    use EnergyField::*;
    AliasTable::new()
        .with(RollingOutput, &["Laminação (t)"])
        .with(Tl02Output, &["TL02 (t)"])
        .with(GasTl01, &["Laminação TL01 (m³)"])
        .with(GasTl02, &["Laminação TL02 (Calculado) (m³)"])
        .with(GasCalorificValue, &["PCS(kcal/m³)"])
        .with(SwitchgearInput, &["Entrada 2 SWG (Danieli)    (kWh)"])
        .with(WaterPlant, &["ETA 03     (kWh)"])
        .with(OverheadCrane, &["Ponte Rolante (kWh)"])
}
