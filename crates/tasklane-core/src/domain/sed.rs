//! SED types and the descriptions used verbatim in task text.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Structured Electronic Document type.
///
/// The code (`P2000`) and its Norwegian title (`Krav om alderspensjon`) both
/// end up in the generated task description. Codes outside the table decode
/// to [`SedType::Other`] so that events whose description never mentions the
/// SED (identity mismatch, attachments) are still processed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SedType {
    P1000,
    P1100,
    P2000,
    P2100,
    P2200,
    P3000No,
    P4000,
    P5000,
    P6000,
    P7000,
    P8000,
    P9000,
    P10000,
    P11000,
    P12000,
    P13000,
    P14000,
    P15000,
    H020,
    H021,
    H070,
    H120,
    H121,
    R004,
    R005,
    R006,
    X005,
    X008,
    X010,
    Other(String),
}

/// Title used for codes outside the table.
pub const UNKNOWN_SED_DESCRIPTION: &str = "Ukjent SED-type";

impl SedType {
    pub fn code(&self) -> &str {
        match self {
            SedType::P1000 => "P1000",
            SedType::P1100 => "P1100",
            SedType::P2000 => "P2000",
            SedType::P2100 => "P2100",
            SedType::P2200 => "P2200",
            SedType::P3000No => "P3000_NO",
            SedType::P4000 => "P4000",
            SedType::P5000 => "P5000",
            SedType::P6000 => "P6000",
            SedType::P7000 => "P7000",
            SedType::P8000 => "P8000",
            SedType::P9000 => "P9000",
            SedType::P10000 => "P10000",
            SedType::P11000 => "P11000",
            SedType::P12000 => "P12000",
            SedType::P13000 => "P13000",
            SedType::P14000 => "P14000",
            SedType::P15000 => "P15000",
            SedType::H020 => "H020",
            SedType::H021 => "H021",
            SedType::H070 => "H070",
            SedType::H120 => "H120",
            SedType::H121 => "H121",
            SedType::R004 => "R004",
            SedType::R005 => "R005",
            SedType::R006 => "R006",
            SedType::X005 => "X005",
            SedType::X008 => "X008",
            SedType::X010 => "X010",
            SedType::Other(code) => code,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            SedType::P1000 => "Anmodning om perioder med omsorg for barn",
            SedType::P1100 => "Svar på anmodning om perioder med omsorg for barn",
            SedType::P2000 => "Krav om alderspensjon",
            SedType::P2100 => "Krav om gjenlevendepensjon",
            SedType::P2200 => "Krav om uførepensjon",
            SedType::P3000No => "Landsspesifikk informasjon - Norge",
            SedType::P4000 => "Brukers oversikt botid og arbeid",
            SedType::P5000 => "Oversikt TT",
            SedType::P6000 => "Melding om vedtak",
            SedType::P7000 => "Samlet melding om vedtak",
            SedType::P8000 => "Forespørsel om informasjon",
            SedType::P9000 => "Svar på forespørsel om informasjon",
            SedType::P10000 => "Oversendelse av informasjon",
            SedType::P11000 => "Anmodning om pensjonsbeløp",
            SedType::P12000 => "Informasjon om pensjonsbeløp",
            SedType::P13000 => "Informasjon om pensjonstillegg",
            SedType::P14000 => "Endring i personlige forhold",
            SedType::P15000 => "Overføring av pensjonssaker til EESSI",
            SedType::H020 => "Krav om refusjon - administrativ kontroll / medisinsk informasjon",
            SedType::H021 => "Svar på krav om refusjon - administrativ kontroll / medisinsk informasjon",
            SedType::H070 => "Melding om dødsfall",
            SedType::H120 => "Anmodning om medisinsk informasjon",
            SedType::H121 => "Melding om medisinsk informasjon / Svar på forespørsel om medisinsk informasjon",
            SedType::R004 => "Melding om utbetaling",
            SedType::R005 => "Anmodning om motregning i etterbetalinger (foreløpig eller endelig)",
            SedType::R006 => "Svar på anmodning om informasjon",
            SedType::X005 => "Legg til ny institusjon",
            SedType::X008 => "Ugyldiggjøre SED",
            SedType::X010 => "Svar på påminnelse",
            SedType::Other(_) => UNKNOWN_SED_DESCRIPTION,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, SedType::Other(_))
    }
}

impl From<String> for SedType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "P1000" => SedType::P1000,
            "P1100" => SedType::P1100,
            "P2000" => SedType::P2000,
            "P2100" => SedType::P2100,
            "P2200" => SedType::P2200,
            "P3000_NO" => SedType::P3000No,
            "P4000" => SedType::P4000,
            "P5000" => SedType::P5000,
            "P6000" => SedType::P6000,
            "P7000" => SedType::P7000,
            "P8000" => SedType::P8000,
            "P9000" => SedType::P9000,
            "P10000" => SedType::P10000,
            "P11000" => SedType::P11000,
            "P12000" => SedType::P12000,
            "P13000" => SedType::P13000,
            "P14000" => SedType::P14000,
            "P15000" => SedType::P15000,
            "H020" => SedType::H020,
            "H021" => SedType::H021,
            "H070" => SedType::H070,
            "H120" => SedType::H120,
            "H121" => SedType::H121,
            "R004" => SedType::R004,
            "R005" => SedType::R005,
            "R006" => SedType::R006,
            "X005" => SedType::X005,
            "X008" => SedType::X008,
            "X010" => SedType::X010,
            _ => SedType::Other(value),
        }
    }
}

impl From<SedType> for String {
    fn from(value: SedType) -> Self {
        value.code().to_string()
    }
}

impl fmt::Display for SedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SedType {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(SedType::from(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_and_description() {
        assert_eq!(SedType::P2000.code(), "P2000");
        assert_eq!(SedType::P2000.description(), "Krav om alderspensjon");
        assert_eq!(SedType::P3000No.to_string(), "P3000_NO");
    }

    #[test]
    fn decodes_from_code() {
        let sed: SedType = serde_json::from_str("\"P3000_NO\"").unwrap();
        assert_eq!(sed, SedType::P3000No);
        assert_eq!("R005".parse::<SedType>().unwrap(), SedType::R005);
    }

    #[test]
    fn unknown_code_is_kept_verbatim() {
        let sed: SedType = serde_json::from_str("\"P3000_SE\"").unwrap();
        assert_eq!(sed, SedType::Other("P3000_SE".into()));
        assert!(!sed.is_known());
        assert_eq!(sed.code(), "P3000_SE");
        assert_eq!(sed.description(), UNKNOWN_SED_DESCRIPTION);
        assert_eq!(serde_json::to_string(&sed).unwrap(), "\"P3000_SE\"");
    }
}
