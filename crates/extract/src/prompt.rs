use serde::{Deserialize, Serialize};

use crate::error::ExtractError;

/// Marker substituted with the substrate symbol inside the worked examples.
const SUBSTRATE_MARKER: &str = "{substrate}";

// The output grammar below is what `parser::parse` accepts. Change both together.
const RULES: &str = r#"You are an expert in extracting kinase-substrate phosphorylation interactions from scientific text.

TASK:
1. Extract only phosphorylation and dephosphorylation interactions.
2. A kinase is named by phrases like "phosphorylated by" or "phosphorylation by".
3. Label a protein as a phosphatase only when the text explicitly says "dephosphorylated by" that protein.
4. Do not extract a protein that is only "regulated by phosphorylation" or "affected by phosphorylation".
5. If phosphorylation is only a prerequisite for another modification (ubiquitination, acetylation, methylation), return N/A.
6. Exclude statements where phosphorylation is merely "enhanced" and no acting protein is named.
7. If a kinase is explicitly named, extract it even when other biological effects are described.
8. Autophosphorylation means the protein is its own kinase: name the substrate gene as the kinase.
9. If the text hedges with "probably" or "likely", keep the kinase and tag it (kinase/uncertain).
10. If no valid interaction exists, return exactly: N/A

OUTPUT FORMAT (strict):
- Plain text lines only. No markdown, no bullets, no tables, no reasoning.
- One interaction per line, exactly four comma-separated fields:
  ACTOR(role), SUBSTRATE(substrate), SITE(location), EVIDENCE
- ACTOR role tags: (kinase), (kinase/uncertain), (phosphatase)
- Several actors sharing one role go in the ACTOR field joined by " and ", never by commas.
- SITE examples: Ser-473, Thr-308, Tyr-15, C-terminus. Use N/A when no site is given.
- One site per line; repeat the line for each additional site.
- EVIDENCE is one identifier such as PubMed:12345678, or N/A. Repeat the line for each additional identifier.
- Use N/A(kinase) as ACTOR when sites are given but no acting protein is named."#;

const EXAMPLES: &str = r#"EXAMPLES:
Input: "Phosphorylation at Thr-161 by CAK/CDK7 activates kinase activity (PubMed:20360007)."
Output: CAK/CDK7(kinase), {substrate}(substrate), Thr-161(location), PubMed:20360007

Input: "Phosphorylation at Tyr-15 by WEE1 and WEE2 inhibits the protein kinase activity (PubMed:20360007)."
Output: WEE1 and WEE2(kinase), {substrate}(substrate), Tyr-15(location), PubMed:20360007

Input: "Phosphorylation at Thr-14 and Tyr-15 by PKMYT1 prevents nuclear translocation (PubMed:7569953)."
Output:
PKMYT1(kinase), {substrate}(substrate), Thr-14(location), PubMed:7569953
PKMYT1(kinase), {substrate}(substrate), Tyr-15(location), PubMed:7569953

Input: "Dephosphorylated at Tyr-1162 by PTPN1 (PubMed:12345678)."
Output: PTPN1(phosphatase), {substrate}(substrate), Tyr-1162(location), PubMed:12345678

Input: "Probably phosphorylated by PKC; decreases single-channel open probability."
Output: PKC(kinase/uncertain), {substrate}(substrate), N/A, N/A

Input: "Autophosphorylated and phosphorylated during M-phase (PubMed:10518011)."
Output: {substrate}(kinase), {substrate}(substrate), N/A, PubMed:10518011

Input: "Phosphorylated at Ser-68 in the PEST region."
Output: N/A(kinase), {substrate}(substrate), Ser-68(location), N/A

Input: "Phosphorylated."
Output: N/A

Input: "Dephosphorylated in response to apoptotic stress (PubMed:27995898)."
Output: N/A

Input: "Stearoylated by ZDHHC6 which inhibits TFRC-mediated activation of the JNK pathway (PubMed:26214738)."
Output: N/A"#;

/// A fully rendered extraction instruction for one annotation text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtractionRequest {
    pub prompt: String,
    pub substrate_symbol: String,
}

pub fn build_extraction_prompt(
    annotation_text: &str,
    substrate_symbol: &str,
) -> Result<ExtractionRequest, ExtractError> {
    let text = annotation_text.trim();
    if text.is_empty() {
        return Err(ExtractError::EmptyInput);
    }

    let examples = EXAMPLES.replace(SUBSTRATE_MARKER, substrate_symbol);

    Ok(ExtractionRequest {
        prompt: format!(
            "{}\n\n{}\n\nNow process this PTM text exactly under the rules above.\n\nSubstrate gene: {}\nPTM text: {}",
            RULES, examples, substrate_symbol, text
        ),
        substrate_symbol: substrate_symbol.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_input() {
        let request =
            build_extraction_prompt("Phosphorylated by CDK2 at Ser-807.", "RB1").unwrap();
        assert!(request.prompt.starts_with(RULES));
        assert!(request.prompt.ends_with(
            "Substrate gene: RB1\nPTM text: Phosphorylated by CDK2 at Ser-807."
        ));
        assert_eq!(request.substrate_symbol, "RB1");
    }

    #[test]
    fn test_examples_use_substrate_symbol() {
        let request = build_extraction_prompt("Autophosphorylated.", "AURKB").unwrap();
        assert!(request
            .prompt
            .contains("AURKB(kinase), AURKB(substrate), N/A, PubMed:10518011"));
        assert!(!request.prompt.contains(SUBSTRATE_MARKER));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let a = build_extraction_prompt("Phosphorylated by PLK1.", "CDC25C").unwrap();
        let b = build_extraction_prompt("Phosphorylated by PLK1.", "CDC25C").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_input_rejected() {
        assert!(matches!(
            build_extraction_prompt("", "RB1"),
            Err(ExtractError::EmptyInput)
        ));
        assert!(matches!(
            build_extraction_prompt(" \n\t ", "RB1"),
            Err(ExtractError::EmptyInput)
        ));
    }
}
