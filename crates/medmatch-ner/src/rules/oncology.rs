//! Diagnosis, cancer type, stage, biomarker and performance status rules.

use medmatch_common::{EntityType, Language};
use regex::Captures;

use super::{term, title_case, PatternRule, Qualifier, ValueTemplate};
use crate::stage::{numeral_value, StageLevel};

use EntityType::{Biomarker, CancerType, Diagnosis, PerformanceStatus, Stage};
use Language::{Any, En, It};

pub(super) fn diagnosis_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Diagnosis,
            En,
            r"(?i)\bdiagnos(?:ed|is)\s+(?:with|of)\s+(?:an?\s+)?([a-z][a-z\-\s]{2,60}?)\s*(?:\b(?:in|on|at|and|with|since|stage|after|during|which|who|that)\b|[,.;:()]|$)",
            ValueTemplate::Derive(diagnosis_phrase),
        ),
        PatternRule::new(
            Diagnosis,
            En,
            r"(?i)\bdiagnosis\s*:\s*([a-z][a-z\-\s]{2,60}?)\s*(?:[,.;(]|$)",
            ValueTemplate::Derive(diagnosis_phrase),
        ),
        PatternRule::new(
            Diagnosis,
            It,
            r"(?i)\b(?:diagnosi\s+di|diagnosticat[oa]\s+(?:con\s+)?|affett[oa]\s+da)\s*(?:un[oa']?\s*)?([a-z][a-z\-'\s]{2,60}?)\s*(?:\b(?:in|nel|nell|a|con|stadio|dopo|e)\b|[,.;:()]|$)",
            ValueTemplate::Derive(diagnosis_phrase),
        ),
        PatternRule::new(
            Diagnosis,
            En,
            r"(?i)\b(adenocarcinoma|carcinoma|sarcoma|neoplasm|malignancy|cancer|tumou?r)\b",
            ValueTemplate::Derive(generic_diagnosis),
        ),
        PatternRule::new(
            Diagnosis,
            It,
            r"(?i)\b(neoplasia|tumore|carcinoma|adenocarcinoma|cancro|sarcoma)\b",
            ValueTemplate::Derive(generic_diagnosis),
        ),
    ]
}

fn diagnosis_phrase(caps: &Captures<'_>) -> Option<String> {
    let phrase = caps.get(1)?.as_str().trim().trim_end_matches('-');
    (phrase.len() >= 3).then(|| title_case(phrase))
}

fn generic_diagnosis(caps: &Captures<'_>) -> Option<String> {
    let word = caps.get(1)?.as_str().to_lowercase();
    let canonical = match word.as_str() {
        "neoplasia" | "neoplasm" => "Neoplasm",
        "tumore" | "tumor" | "tumour" => "Tumor",
        "cancro" | "cancer" => "Cancer",
        "malignancy" => "Malignancy",
        "adenocarcinoma" => "Adenocarcinoma",
        "carcinoma" => "Carcinoma",
        "sarcoma" => "Sarcoma",
        _ => return None,
    };
    Some(canonical.to_string())
}

/// Canonical cancer types. Every canonical value names its anatomical site
/// so that trial scoring can compare by site keyword.
pub(super) fn cancer_type_rules() -> Vec<PatternRule> {
    vec![
        // Breast
        term(CancerType, En, "Triple-Negative Breast Cancer", r"triple[-\s]negative\s+breast\s+(?:cancer|carcinoma)|TNBC"),
        term(CancerType, It, "Triple-Negative Breast Cancer", r"carcinoma\s+(?:mammario\s+)?triplo[-\s]negativo(?:\s+della\s+mammella)?"),
        term(CancerType, En, "Invasive Ductal Breast Carcinoma", r"invasive\s+ductal\s+(?:breast\s+)?carcinoma(?:\s+of\s+the\s+breast)?"),
        term(CancerType, It, "Invasive Ductal Breast Carcinoma", r"carcinoma\s+duttale\s+infiltrante(?:\s+della\s+mammella)?"),
        term(CancerType, En, "Invasive Lobular Breast Carcinoma", r"invasive\s+lobular\s+(?:breast\s+)?carcinoma"),
        term(CancerType, It, "Invasive Lobular Breast Carcinoma", r"carcinoma\s+lobulare\s+infiltrante"),
        term(CancerType, En, "Breast Cancer", r"breast\s+(?:cancer|carcinoma|neoplasm|tumou?r)|cancer\s+of\s+the\s+breast"),
        term(CancerType, It, "Breast Cancer", r"(?:carcinoma|tumore|neoplasia|cancro)\s+(?:della\s+|alla\s+)?mammell?a|(?:carcinoma|tumore|neoplasia)\s+mammari[oa]"),
        // Lung
        term(CancerType, Any, "Non-Small Cell Lung Cancer", r"NSCLC"),
        term(CancerType, En, "Non-Small Cell Lung Cancer", r"non[-\s]?small[-\s]cell\s+lung\s+(?:cancer|carcinoma)"),
        term(CancerType, It, "Non-Small Cell Lung Cancer", r"(?:carcinoma|tumore|neoplasia)\s+(?:polmonare|del\s+polmone)\s+non\s+a\s+piccole\s+cellule"),
        PatternRule::new(
            CancerType,
            En,
            r"(?i)\b(non[-\s]?)?small[-\s]cell\s+lung\s+(?:cancer|carcinoma)\b|\bSCLC\b",
            ValueTemplate::Derive(small_cell_only),
        ),
        PatternRule::new(
            CancerType,
            It,
            r"(?i)\bmicrocitoma(?:\s+polmonare)?\b|\b(?:carcinoma|tumore)\s+(?:polmonare|del\s+polmone)\s+(non\s+)?a\s+piccole\s+cellule\b",
            ValueTemplate::Derive(small_cell_only),
        ),
        term(CancerType, En, "Lung Adenocarcinoma", r"lung\s+adenocarcinoma|adenocarcinoma\s+of\s+the\s+lung"),
        term(CancerType, It, "Lung Adenocarcinoma", r"adenocarcinoma\s+(?:polmonare|del\s+polmone)"),
        term(CancerType, En, "Squamous Cell Lung Carcinoma", r"squamous[-\s]cell\s+(?:carcinoma\s+of\s+the\s+lung|lung\s+(?:cancer|carcinoma))"),
        term(CancerType, It, "Squamous Cell Lung Carcinoma", r"carcinoma\s+squamoso\s+(?:polmonare|del\s+polmone)"),
        term(CancerType, En, "Lung Cancer", r"lung\s+(?:cancer|carcinoma|neoplasm|tumou?r)"),
        term(CancerType, It, "Lung Cancer", r"(?:carcinoma|tumore|neoplasia|cancro)\s+(?:del\s+)?polmon(?:e|are)"),
        // Colorectal
        term(CancerType, En, "Colorectal Cancer", r"colorectal\s+(?:cancer|carcinoma|adenocarcinoma)|CRC"),
        term(CancerType, It, "Colorectal Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma)\s+(?:del\s+)?colon[-\s]?retto|(?:carcinoma|tumore|neoplasia)\s+colorettale"),
        term(CancerType, En, "Colon Cancer", r"colon\s+(?:cancer|carcinoma|adenocarcinoma)"),
        term(CancerType, It, "Colon Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma)\s+del\s+colon"),
        term(CancerType, En, "Rectal Cancer", r"rectal\s+(?:cancer|carcinoma|adenocarcinoma)"),
        term(CancerType, It, "Rectal Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma)\s+del\s+retto"),
        // Pancreas
        term(CancerType, En, "Pancreatic Ductal Adenocarcinoma", r"pancreatic\s+ductal\s+adenocarcinoma|PDAC"),
        term(CancerType, It, "Pancreatic Ductal Adenocarcinoma", r"adenocarcinoma\s+duttale\s+(?:del\s+)?pancrea(?:s|tico)"),
        term(CancerType, En, "Pancreatic Cancer", r"pancreatic\s+(?:cancer|carcinoma|adenocarcinoma|neoplasm)"),
        term(CancerType, It, "Pancreatic Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma|cancro)\s+(?:del\s+)?pancrea(?:s|tico)"),
        // Other solid tumours
        term(CancerType, En, "Prostate Cancer", r"prostate\s+(?:cancer|carcinoma|adenocarcinoma)|prostatic\s+adenocarcinoma"),
        term(CancerType, It, "Prostate Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma)\s+(?:della\s+)?prostat(?:a|ico)"),
        term(CancerType, En, "Ovarian Cancer", r"ovarian\s+(?:cancer|carcinoma)|cancer\s+of\s+the\s+ovary"),
        term(CancerType, It, "Ovarian Cancer", r"(?:carcinoma|tumore|neoplasia)\s+(?:ovarico|dell'\s*ovaio)"),
        term(CancerType, En, "Gastric Cancer", r"gastric\s+(?:cancer|carcinoma|adenocarcinoma)|stomach\s+cancer"),
        term(CancerType, It, "Gastric Cancer", r"(?:carcinoma|tumore|neoplasia|adenocarcinoma)\s+(?:gastrico|dello\s+stomaco)"),
        term(CancerType, En, "Hepatocellular Liver Carcinoma", r"hepatocellular\s+carcinoma|HCC|liver\s+cancer"),
        term(CancerType, It, "Hepatocellular Liver Carcinoma", r"epatocarcinoma|carcinoma\s+epatocellulare"),
        term(CancerType, En, "Renal Cell Kidney Carcinoma", r"renal[-\s]cell\s+carcinoma|RCC|kidney\s+cancer"),
        term(CancerType, It, "Renal Cell Kidney Carcinoma", r"carcinoma\s+(?:a\s+cellule\s+)?renal[ei]|tumore\s+(?:del\s+)?rene"),
        term(CancerType, En, "Bladder Cancer", r"bladder\s+(?:cancer|carcinoma)|urothelial\s+(?:bladder\s+)?carcinoma"),
        term(CancerType, It, "Bladder Cancer", r"(?:carcinoma|tumore|neoplasia)\s+(?:della\s+)?vescic(?:a|ale)|carcinoma\s+uroteliale"),
        term(CancerType, En, "Head and Neck Cancer", r"head\s+and\s+neck\s+(?:cancer|squamous\s+cell\s+carcinoma)|HNSCC"),
        term(CancerType, It, "Head and Neck Cancer", r"(?:tumore|carcinoma)\s+(?:del\s+distretto\s+)?testa[-\s]collo"),
        term(CancerType, Any, "Melanoma", r"(?:cutaneous\s+|cutaneo\s+)?melanoma"),
        term(CancerType, Any, "Glioblastoma", r"glioblastoma(?:\s+multiforme)?|GBM"),
        term(CancerType, En, "Lymphoma", r"(?:non[-\s]hodgkin\s+|hodgkin\s+)?lymphoma"),
        term(CancerType, It, "Lymphoma", r"linfoma(?:\s+(?:non\s+)?hodgkin)?"),
    ]
}

fn small_cell_only(caps: &Captures<'_>) -> Option<String> {
    caps.get(1)
        .is_none()
        .then(|| "Small Cell Lung Cancer".to_string())
}

pub(super) fn stage_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            Stage,
            En,
            r"(?i)\bstage\s*:?\s*(?:(?:clinical|pathologic(?:al)?)\s+)?(IV|I{1,3}|[0-4])([ABC])?\b",
            ValueTemplate::Derive(numeric_stage),
        ),
        PatternRule::new(
            Stage,
            It,
            r"(?i)\bstadio\s*:?\s*(?:(?:clinico|patologico)\s+)?(IV|I{1,3}|[0-4])([ABC])?\b",
            ValueTemplate::Derive(numeric_stage),
        ),
        PatternRule::new(
            Stage,
            Any,
            r"\b([cpy]{0,2}T(?:is|x|[0-4])[a-d]?\s?N(?:x|[0-3])[a-c]?\s?M(?:x|[01])[a-c]?)\b",
            ValueTemplate::Derive(compact_tnm),
        ),
        term(
            Stage,
            En,
            "Metastatic",
            r"(?:widely\s+)?metastatic|metastasi[sz]ed|(?:distant|liver|lung|bone|brain|hepatic|pulmonary|osseous)\s+metastas[ie]s|metastas[ie]s\s+to",
        )
        .qualified(Qualifier::Negatable),
        term(
            Stage,
            It,
            "Metastatic",
            r"metastatic[oa]|metastasi\s+(?:a\s+distanza|epatiche|polmonari|ossee|cerebrali|encefaliche)",
        )
        .qualified(Qualifier::Negatable),
        term(Stage, En, "Locally Advanced", r"locally\s+advanced"),
        term(Stage, It, "Locally Advanced", r"localmente\s+avanzat[oa]"),
    ]
}

fn numeric_stage(caps: &Captures<'_>) -> Option<String> {
    let number = numeral_value(caps.get(1)?.as_str())?;
    let letter = caps.get(2).and_then(|m| m.as_str().chars().next());
    Some(StageLevel::new(number, letter).to_string())
}

fn compact_tnm(caps: &Captures<'_>) -> Option<String> {
    Some(caps.get(1)?.as_str().split_whitespace().collect())
}

const GENE_SYMBOLS: &str =
    r"KRAS|NRAS|HRAS|BRAF|EGFR|ALK|ROS1|RET|MET|NTRK[1-3]?|BRCA[12]|PIK3CA|TP53|IDH[12]|ERBB2|FGFR[1-4]?|KIT";

pub(super) fn biomarker_rules() -> Vec<PatternRule> {
    vec![
        // Receptor panels: "ER+/PR+/HER2-", "HR+/HER2-"
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\b(?:(?:ER|PR|PgR|HR|HER-?2)\s*[+-]\s*/\s*)+(?:ER|PR|PgR|HR|HER-?2)\s*[+-]",
            ValueTemplate::Derive(compact_receptors),
        ),
        term(Biomarker, Any, "Triple-Negative", r"tripl[eo][-\s]negativ[eoa]"),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\bHER-?2\s*(?:score\s*|IHC\s*|:\s*)?([0-3])\s*\+",
            ValueTemplate::Expand("HER2 ${1}+"),
        ),
        term(
            Biomarker,
            Any,
            "HER2 amplified",
            r"HER-?2\s+(?:amplified|amplification|amplificat[oa]|amplificazione)",
        ),
        // Single receptor status, in words or symbols.
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\b(ER|PR|PgR|HR|HER-?2|estrogen\s+receptors?|progesterone\s+receptors?|hormone\s+receptors?|recettori?\s+(?:per\s+(?:gli\s+|il\s+)?)?(?:estrogen[io]|estrogenici|progesteron[ei]|progestinici|ormonali))\b\s*(?:status\s*)?[:\-]?\s*(positiv[eoi]|negativ[eoi]|\+|-)",
            ValueTemplate::Derive(receptor_status),
        ),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\bPD-?L1\b[^%.;\d]{0,30}?(\d{1,3}(?:[.,]\d+)?)\s*%",
            ValueTemplate::Derive(pdl1_percent),
        ),
        term(Biomarker, Any, "PD-L1", r"PD-?L1").qualified(Qualifier::MarkerStatus),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\bKi-?67\b[^%.;\d]{0,20}?(\d{1,3}(?:[.,]\d+)?)\s*%",
            ValueTemplate::Derive(ki67_percent),
        ),
        // Gene with a protein-level variant: "KRAS G12C", "BRAF p.V600E"
        PatternRule::new(
            Biomarker,
            Any,
            r"\b(KRAS|NRAS|HRAS|BRAF|EGFR|PIK3CA|IDH1|IDH2|ERBB2|TP53|MET|KIT)\s*(?:p\.)?([ACDEFGHIKLMNPQRSTVWY]\d{1,4}(?:[ACDEFGHIKLMNPQRSTVWY]|fs))\b",
            ValueTemplate::Expand("${1} ${2}"),
        ),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\b(EGFR|ERBB2|HER2|MET)\s+(?:exon|esone)\s*(\d{1,2})\s*(del(?:etion|ezione)?|ins(?:ertion|erzione)?|skipping)?",
            ValueTemplate::Derive(exon_alteration),
        ),
        // Bare gene symbol; status is taken from the surrounding clause.
        PatternRule::new(
            Biomarker,
            Any,
            &format!(
                r"\b({GENE_SYMBOLS})\b(\s*(?:p\.)?[ACDEFGHIKLMNPQRSTVWY]\d{{1,4}}[A-Za-z]|\s+(?:exon|esone)\s*\d)?"
            ),
            ValueTemplate::Derive(gene_without_variant),
        )
        .qualified(Qualifier::MarkerStatus),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\bMSI[-\s]?(H|high|alta|elevata|L|low|bassa)\b",
            ValueTemplate::Derive(msi_status),
        ),
        term(
            Biomarker,
            Any,
            "MSI-H",
            r"microsatellite\s+instability[-\s]high|(?:alta\s+)?instabilita\s+(?:dei\s+)?microsatelliti(?:\s+alta)?",
        ),
        term(Biomarker, Any, "MSS", r"MSS|microsatellite[-\s]stable|stabilita\s+(?:dei\s+)?microsatelliti"),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\b([dp])MMR\b",
            ValueTemplate::Derive(mmr_status),
        ),
        term(
            Biomarker,
            Any,
            "dMMR",
            r"mismatch\s+repair[-\s]defici(?:ent|ency)|deficit\s+(?:del\s+)?mismatch\s+repair",
        ),
        term(Biomarker, Any, "TMB-H", r"TMB[-\s]?(?:H|high|alto|elevato)|(?:high|elevato)\s+TMB"),
        PatternRule::new(
            Biomarker,
            Any,
            r"(?i)\bTMB\b[^.;\d]{0,15}?(\d{1,3}(?:[.,]\d+)?)\s*mut(?:ations|azioni)?\s*/\s*Mb\b",
            ValueTemplate::Derive(tmb_value),
        ),
    ]
}

fn compact_receptors(caps: &Captures<'_>) -> Option<String> {
    let compact: String = caps.get(0)?.as_str().split_whitespace().collect();
    Some(compact.to_uppercase().replace("HER-2", "HER2").replace("PGR", "PR"))
}

fn receptor_status(caps: &Captures<'_>) -> Option<String> {
    let name = caps.get(1)?.as_str().to_lowercase();
    let symbol = if name.starts_with("her") {
        "HER2"
    } else if name == "er" || name.contains("estrogen") {
        "ER"
    } else if name == "pr" || name == "pgr" || name.contains("progest") {
        "PR"
    } else {
        "HR"
    };
    let status = caps.get(2)?.as_str().to_lowercase();
    let sign = if status == "+" || status.starts_with("positiv") {
        '+'
    } else {
        '-'
    };
    Some(format!("{symbol}{sign}"))
}

fn percent(caps: &Captures<'_>) -> Option<String> {
    let raw = caps.get(1)?.as_str().replace(',', ".");
    let value: f64 = raw.parse().ok()?;
    if !(0.0..=100.0).contains(&value) {
        return None;
    }
    Some(raw.trim_end_matches(".0").to_string())
}

fn pdl1_percent(caps: &Captures<'_>) -> Option<String> {
    Some(format!("PD-L1 {}%", percent(caps)?))
}

fn ki67_percent(caps: &Captures<'_>) -> Option<String> {
    Some(format!("Ki-67 {}%", percent(caps)?))
}

fn exon_alteration(caps: &Captures<'_>) -> Option<String> {
    let gene = caps.get(1)?.as_str().to_uppercase();
    let exon = caps.get(2)?.as_str();
    let kind = caps.get(3).map(|m| m.as_str().to_lowercase());
    let kind = match kind.as_deref() {
        Some(k) if k.starts_with("del") => " deletion",
        Some(k) if k.starts_with("ins") => " insertion",
        Some(_) => " skipping",
        None => "",
    };
    Some(format!("{gene} exon {exon}{kind}"))
}

fn gene_without_variant(caps: &Captures<'_>) -> Option<String> {
    if caps.get(2).is_some() {
        return None;
    }
    Some(caps.get(1)?.as_str().to_string())
}

fn msi_status(caps: &Captures<'_>) -> Option<String> {
    let level = caps.get(1)?.as_str().to_lowercase();
    let value = match level.as_str() {
        "h" | "high" | "alta" | "elevata" => "MSI-H",
        _ => "MSI-L",
    };
    Some(value.to_string())
}

fn mmr_status(caps: &Captures<'_>) -> Option<String> {
    let prefix = caps.get(1)?.as_str().to_lowercase();
    Some(format!("{prefix}MMR"))
}

fn tmb_value(caps: &Captures<'_>) -> Option<String> {
    Some(format!("TMB {} mut/Mb", percent(caps)?))
}

pub(super) fn performance_status_rules() -> Vec<PatternRule> {
    vec![
        PatternRule::new(
            PerformanceStatus,
            Any,
            r"(?i)\bECOG(?:\s*PS)?(?:\s+performance\s+status)?\s*(?:[:=]|of|di|pari\s+a)?\s*([0-4])\b",
            ValueTemplate::Expand("ECOG ${1}"),
        ),
        PatternRule::new(
            PerformanceStatus,
            En,
            r"(?i)\bperformance\s+status\s*(?:\(ECOG\))?\s*(?:[:=]|of)?\s*([0-4])\b",
            ValueTemplate::Expand("ECOG ${1}"),
        ),
    ]
}
