/// JSON shape the model must return. Mirrors [`crate::AnalysisResult`]; keep
/// the two in sync.
pub const OUTPUT_SCHEMA: &str = r#"{
  "videoTitle": "string",
  "bluf": "string",
  "tldr": ["string"],
  "executiveSummary": {
    "overview": "string",
    "sections": [
      {
        "title": "string",
        "content": "string"
      }
    ]
  },
  "keyQuotes": [
    {
      "quote": "string",
      "context": "string"
    }
  ],
  "qualityScore": {
    "informational": number,
    "salesly": number,
    "analysis": "string"
  }
}"#;

const INSTRUCTIONS: &str = "\
For videoTitle, give the title of the video as best it can be inferred from the transcript.

For bluf, write a single paragraph with the bottom line up front: the one thing a viewer should take away.

For tldr, list the key highlights as short bullet points.

For executiveSummary, break down the content into logical sections with headers. Use markdown formatting for emphasis where appropriate. Each section should have a clear title and detailed content.

For keyQuotes, extract 3-5 significant quotes from the transcript that capture key moments or insights. Include a brief context for each quote.

For qualityScore:
- informational: Rate from 1-10 how informative and educational the content is
- salesly: Rate from 1-10 how sales-focused or promotional the content is
- analysis: Provide a brief analysis of the content quality and target audience

Do not include any markdown formatting or code blocks. Return only the JSON object.";

/// Build the analysis prompt for a transcript. The transcript is embedded
/// verbatim; length limits are left to the provider.
pub fn build_prompt(transcript: &str) -> String {
    format!(
        "Summarize the following YouTube video transcript and provide a JSON object with the following structure:\n\
         {OUTPUT_SCHEMA}\n\n\
         {INSTRUCTIONS}\n\n\
         Transcript:\n\
         {transcript}"
    )
}
