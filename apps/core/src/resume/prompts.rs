// Prompt constants for feedback generation.
// The response format matters more than the wording: the workflow parses
// replies strictly against this schema and keeps anything else as raw text.

/// Schema the generator must emit. Spliced into the instruction template as
/// `{response_format}`.
pub const FEEDBACK_RESPONSE_FORMAT: &str = r#"{
  "overallScore": number (0-100),
  "ATS": {
    "score": number (0-100),
    "tips": [
      { "type": "good" | "improve", "tip": "short headline" }
    ]
  },
  "toneAndStyle": {
    "score": number (0-100),
    "tips": [
      { "type": "good" | "improve", "tip": "short headline", "explanation": "detailed explanation" }
    ]
  },
  "content": { same shape as "toneAndStyle" },
  "structure": { same shape as "toneAndStyle" },
  "skills": { same shape as "toneAndStyle" }
}"#;

/// Instruction template. Replace `{job_title}` and `{job_description}` via
/// [`prepare_instructions`] before sending.
const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an expert in ATS (Applicant Tracking Systems) and resume analysis.
Please analyze and rate this resume and suggest how to improve it.
The rating can be low if the resume is bad.
Be thorough and detailed. Don't be afraid to point out any mistakes or areas for improvement.
If there is a lot to improve, don't hesitate to give low scores.
Take the job description into consideration.

The job title is: {job_title}
The job description is: {job_description}

Provide the feedback using the following format:
{response_format}

Return the analysis as a JSON object, without any other text and without the backticks.
Do not include any other text or comments."#;

/// Builds the generation instruction for one submission.
pub fn prepare_instructions(job_title: &str, job_description: &str) -> String {
    FEEDBACK_PROMPT_TEMPLATE
        .replace("{response_format}", FEEDBACK_RESPONSE_FORMAT)
        .replace("{job_title}", job_title)
        .replace("{job_description}", job_description)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_instructions_splices_everything() {
        let prompt = prepare_instructions("Staff Engineer", "Ship things fast");
        assert!(prompt.contains("The job title is: Staff Engineer"));
        assert!(prompt.contains("The job description is: Ship things fast"));
        assert!(prompt.contains("\"overallScore\": number (0-100)"));
        assert!(!prompt.contains("{job_title}"));
        assert!(!prompt.contains("{response_format}"));
    }

    #[test]
    fn test_prepare_instructions_with_empty_fields() {
        let prompt = prepare_instructions("", "");
        assert!(prompt.contains("The job title is: \n"));
    }
}
